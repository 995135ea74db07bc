use paperlens_lib::models::{FeedbackCategory, SectionName};
use paperlens_lib::services::review::{
    extract_document_sentences, segment_sections, HeuristicClassifier, SegmentationStrategy,
};
use paperlens_lib::services::sentence_segmenter::detector_from_config;
use paperlens_lib::services::text_processor::preview;
use paperlens_lib::services::{AppConfig, DocumentExtractor, FileExtractor};
use serde::Serialize;
use std::path::Path;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SentenceDump {
    section: SectionName,
    label: Option<FeedbackCategory>,
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    file: String,
    strategy: SegmentationStrategy,
    sections: Vec<(SectionName, String)>,
    sentences: Vec<SentenceDump>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  cargo run --bin segment_paper -- <paper.pdf|docx|txt> [--linear] [--sentences <n>] [--out <json_path>]\n\nNotes:\n  - `--linear` uses the non-overlapping linear scan instead of independent patterns.\n  - PAPERLENS_SEGMENTER_URL selects a remote sentence segmenter (falls back to local rules)."
        );
        return Ok(());
    }

    let path = args[1].clone();
    let strategy = if has_flag(&args, "--linear") {
        SegmentationStrategy::LinearScan
    } else {
        SegmentationStrategy::IndependentPatterns
    };
    let sentences_n: usize = parse_arg_value(&args, "--sentences")
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);
    let out_path = parse_arg_value(&args, "--out");

    let config = AppConfig::load_effective();
    let text = FileExtractor
        .extract(Path::new(&path))
        .await
        .map_err(|e| e.to_string())?;

    let sections = segment_sections(&text, strategy);
    let detector = detector_from_config(&config.segmenter);
    let sentences = extract_document_sentences(detector.as_ref(), &sections).await;
    let classifier = HeuristicClassifier::new(&config.keywords);

    println!("File: {}", path);
    println!("Extracted: {} chars ({} bytes)", text.chars().count(), text.len());
    println!("Strategy: {:?}", strategy);
    println!();

    for section in sections.iter() {
        println!(
            "[{}] chars={}  {}",
            section.name,
            section.raw_text.chars().count(),
            if section.raw_text.is_empty() {
                "(no match)".to_string()
            } else {
                preview(&section.raw_text, 100)
            }
        );
    }
    println!();

    let dumps: Vec<SentenceDump> = sentences
        .iter()
        .map(|s| SentenceDump {
            section: s.section,
            label: classifier.classify_sentence(&s.text),
            text: s.text.clone(),
        })
        .collect();

    println!("Sentences: {}", dumps.len());
    for (i, s) in dumps.iter().take(sentences_n).enumerate() {
        let label = s.label.map(|l| l.label()).unwrap_or("-");
        println!(
            "[S{:04}] {:<12} {:<11} {}",
            i,
            s.section.as_str(),
            label,
            preview(&s.text, 120)
        );
    }
    if dumps.len() > sentences_n {
        println!("... ({} more sentences)", dumps.len() - sentences_n);
    }

    if let Some(out_path) = out_path {
        let output = Output {
            file: path,
            strategy,
            sections: sections
                .iter()
                .map(|s| (s.name, s.raw_text.clone()))
                .collect(),
            sentences: dumps,
        };
        let json = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
        std::fs::write(&out_path, json).map_err(|e| format!("write output failed: {}", e))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
