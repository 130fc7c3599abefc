//! Terminal cover chooser.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use goweli_catalog::{CoverDecider, CoverDecision, CoverPreview};

/// Asks on stdin whether to keep each cover preview
pub struct PromptDecider;

impl PromptDecider {
    pub fn stdin() -> Self {
        Self
    }
}

/// Map a typed answer to a decision; `None` asks again
fn parse_answer(answer: &str) -> Option<CoverDecision> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(CoverDecision::Accept),
        "n" | "no" => Some(CoverDecision::Reject),
        "q" | "quit" => Some(CoverDecision::Abandon),
        _ => None,
    }
}

fn ask(prompt: String) -> CoverDecision {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("{prompt}");
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            // EOF or a closed terminal: keep no cover
            Ok(0) | Err(_) => return CoverDecision::Abandon,
            Ok(_) => {}
        }
        if let Some(decision) = parse_answer(&line) {
            return decision;
        }
        println!("Please answer y (use it), n (next cover) or q (no cover).");
    }
}

#[async_trait]
impl CoverDecider for PromptDecider {
    async fn decide(&mut self, preview: &CoverPreview) -> CoverDecision {
        let prompt = format!(
            "Cover {}/{} ({} bytes): {}\nUse this cover? [y/n/q] ",
            preview.position + 1,
            preview.total,
            preview.bytes.len(),
            preview.url
        );
        tokio::task::spawn_blocking(move || ask(prompt))
            .await
            .unwrap_or(CoverDecision::Abandon)
    }
}
