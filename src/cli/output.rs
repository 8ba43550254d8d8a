//! CLI output formatting utilities
//!
//! The answer and command reports go to stdout; diagnostics go through
//! `tracing` to stderr.

use std::io::Write;
use std::path::Path;

use crate::cache::CacheStats;
use crate::rag::IndexingReport;
use crate::rag::RagAnswer;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_prompt(msg: &str) {
    print!("{msg}");
    let _ = std::io::stdout().flush();
}

/// Render a generated answer, optionally followed by its contexts
///
/// The model's text is emitted exactly as returned.
#[must_use]
pub fn format_answer(answer: &RagAnswer, show_context: bool) -> String {
    let mut out = format!("\nAnswer:\n{}\n", answer.answer);

    if show_context {
        out.push_str(&format!("\nContexts ({}):\n", answer.contexts.len()));
        for (idx, context) in answer.contexts.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", idx + 1, truncate_str(context, 160)));
        }
    }
    out
}

pub fn print_answer(answer: &RagAnswer, show_context: bool) {
    print!("{}", format_answer(answer, show_context));
    let _ = std::io::stdout().flush();
}

/// Print an indexing report, listing failed ids when there are any
pub fn print_indexing_report(report: &IndexingReport) {
    if report.is_complete() {
        print_success(&format!("Indexed {report}"));
        return;
    }

    print_warning(&format!("Indexed with failures: {report}"));
    for failure in &report.failed {
        println!("  - {}: {}", failure.id, failure.reason);
    }
}

pub fn print_cache_stats(path: &Path, entries: usize, stats: &CacheStats) {
    println!("🗃️  Response cache: {}", path.display());
    println!("  Cached answers: {entries}");
    if stats.hits + stats.misses > 0 {
        println!(
            "  This session: {} hits, {} misses ({:.0}% hit rate)",
            stats.hits,
            stats.misses,
            stats.hit_rate() * 100.0
        );
    }
}

/// Print the configuration with secrets masked
pub fn print_config(config: &AppConfig) {
    let config = config.masked();
    println!("📋 TableRAG Configuration:");
    println!();

    println!("🧮 Embeddings:");
    println!("  Provider: {:?}", config.embeddings.provider);
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embeddings.model);
    println!("  Dimension: {}", config.embeddings.dimension);
    println!("  Parallel tasks: {}", config.embeddings.parallel_tasks);
    if let Some(key) = &config.embeddings.api_key {
        println!("  API key: {key}");
    }
    println!();

    println!("🗄️  Index:");
    println!("  Backend: {:?}", config.index.backend);
    println!("  Database: {}", config.index.database_url);
    println!("  Name: {}", config.index.name);
    println!("  Metric: {}", config.index.metric);
    println!(
        "  HNSW: m={} ef_construction={}",
        config.index.hnsw_m, config.index.hnsw_ef_construction
    );
    println!("  Recreate on index: {}", config.index.recreate);
    println!();

    println!("✂️  Chunking: max {} words", config.chunking.max_words);
    println!("🔎 Retrieval: top {}", config.retrieval.top_k);
    println!();

    println!("🤖 LLM:");
    println!("  Provider: {:?}", config.llm.provider);
    println!("  Endpoint: {}", config.llm.endpoint);
    println!("  Model: {}", config.llm.model);
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max tokens: {}", config.llm.max_tokens);
    if let Some(key) = &config.llm.api_key {
        println!("  API key: {key}");
    }
    println!();

    println!(
        "🗃️  Cache: {} ({})",
        config.cache.path,
        if config.cache.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "⏱️  Timeouts: embed {}s, index {}s, generate {}s",
        config.timeouts.embed_secs, config.timeouts.index_secs, config.timeouts.generate_secs
    );
    println!(
        "📝 Logging: level {}, directory {} (file output: {})",
        config.logging.level, config.logging.directory, config.logging.file_output
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_respects_char_boundaries() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("👟👟👟", 2), "👟👟...");
    }

    #[test]
    fn test_answer_text_is_not_altered() {
        let answer = RagAnswer {
            answer: "  The red shoe.\n\n".to_string(),
            contexts: vec!["The red shoe".to_string()],
        };
        assert_eq!(format_answer(&answer, false), "\nAnswer:\n  The red shoe.\n\n\n");
    }

    #[test]
    fn test_answer_with_contexts() {
        let answer = RagAnswer {
            answer: "red".to_string(),
            contexts: vec!["The red shoe".to_string(), "sells well".to_string()],
        };
        let out = format_answer(&answer, true);
        assert!(out.starts_with("\nAnswer:\nred\n"));
        assert!(out.contains("Contexts (2):\n  1. The red shoe\n  2. sells well\n"));
    }
}
