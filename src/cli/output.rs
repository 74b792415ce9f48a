use std::fmt::Write as FmtWrite;

use crate::models::{OutputFormat, PageReport, RangeReport, SearchResponse};

pub trait Formatter {
    fn format_search_results(&self, query: &str, response: &SearchResponse, duration_ms: u64)
    -> String;
    fn format_suggestions(&self, suggestions: &[String]) -> String;
    fn format_page_report(&self, report: &PageReport) -> String;
    fn format_range_report(&self, report: &RangeReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub acquisition_backend: String,
    pub embedding_model: String,
    pub embedding_dimension: u32,
    pub openai_key_present: bool,
    pub vector_store_driver: String,
    pub vector_store_url: String,
    pub vector_store_connected: bool,
    pub collection: String,
    pub stored_memes: Option<u64>,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(
        &self,
        query: &str,
        response: &SearchResponse,
        duration_ms: u64,
    ) -> String {
        if response.is_empty() {
            return format!("No memes found for: {}\n", query);
        }

        let mut output = String::new();
        writeln!(output, "Search results for: \"{}\"", query).unwrap();
        writeln!(
            output,
            "Found {} memes in {}ms\n",
            response.memes.len(),
            duration_ms
        )
        .unwrap();

        for (i, (meme, score)) in response.memes.iter().zip(&response.scores).enumerate() {
            writeln!(output, "{}. [Score: {:.3}] {}", i + 1, score, meme.title).unwrap();
            writeln!(output, "   Page:  {}", meme.url).unwrap();
            writeln!(output, "   Image: {}", meme.image_url).unwrap();

            if !meme.ai_description.is_empty() {
                let preview: String = meme.ai_description.chars().take(200).collect();
                let preview = if meme.ai_description.chars().count() > 200 {
                    format!("{}...", preview)
                } else {
                    preview
                };
                for line in preview.lines() {
                    writeln!(output, "   {}", line).unwrap();
                }
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_suggestions(&self, suggestions: &[String]) -> String {
        if suggestions.is_empty() {
            return "No suggestions.\n".to_string();
        }
        let mut output = String::new();
        for title in suggestions {
            writeln!(output, "{}", title).unwrap();
        }
        output
    }

    fn format_page_report(&self, report: &PageReport) -> String {
        let mut output = String::new();
        writeln!(output, "Page {} Complete", report.page).unwrap();
        writeln!(output, "---------------").unwrap();
        writeln!(output, "Run:      {}", report.run_id).unwrap();
        writeln!(output, "Acquired: {}", report.acquired).unwrap();
        writeln!(output, "Captioned: {}", report.enriched).unwrap();
        writeln!(output, "Embedded: {}", report.embedded).unwrap();
        writeln!(output, "Stored:   {}", report.stored).unwrap();
        if !report.memes.is_empty() {
            writeln!(output).unwrap();
            for meme in &report.memes {
                writeln!(output, "  {}", meme.title).unwrap();
            }
        }
        output
    }

    fn format_range_report(&self, report: &RangeReport) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "Indexing Complete (pages {}..{})",
            report.start_page, report.end_page
        )
        .unwrap();
        writeln!(output, "--------------------------------").unwrap();
        writeln!(output, "Pages completed: {}", report.completed_pages()).unwrap();
        writeln!(output, "Pages failed:    {}", report.failed_pages()).unwrap();
        writeln!(output, "Memes stored:    {}", report.total_stored()).unwrap();

        if !report.errors.is_empty() {
            writeln!(output).unwrap();
            writeln!(output, "Failures:").unwrap();
            for failure in &report.errors {
                writeln!(output, "  page {}: {}", failure.page, failure.error).unwrap();
            }
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        writeln!(output, "Acquisition:   {}", status.acquisition_backend).unwrap();
        let key_status = if status.openai_key_present {
            "[SET]"
        } else {
            "[MISSING]"
        };
        writeln!(
            output,
            "OpenAI:        {} (dim {}) key {}",
            status.embedding_model, status.embedding_dimension, key_status
        )
        .unwrap();
        writeln!(output).unwrap();

        let vector_status = if status.vector_store_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, vector_status
        )
        .unwrap();
        writeln!(output, "  URL:         {}", status.vector_store_url).unwrap();
        writeln!(output, "  Collection:  {}", status.collection).unwrap();
        match status.stored_memes {
            Some(count) => writeln!(output, "  Memes:       {}", count).unwrap(),
            None => writeln!(output, "  Memes:       (collection not created)").unwrap(),
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(
        &self,
        query: &str,
        response: &SearchResponse,
        duration_ms: u64,
    ) -> String {
        let json = serde_json::json!({
            "query": query,
            "memes": response.memes,
            "scores": response.scores,
            "durationMs": duration_ms,
        });
        self.render(&json)
    }

    fn format_suggestions(&self, suggestions: &[String]) -> String {
        self.render(&serde_json::json!({ "suggestions": suggestions }))
    }

    fn format_page_report(&self, report: &PageReport) -> String {
        let json = serde_json::to_value(report)
            .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}));
        self.render(&json)
    }

    fn format_range_report(&self, report: &RangeReport) -> String {
        let json = serde_json::json!({
            "startPage": report.start_page,
            "endPage": report.end_page,
            "completedPages": report.completed_pages(),
            "failedPages": report.failed_pages(),
            "totalStored": report.total_stored(),
            "results": report.results,
            "errors": report.errors,
        });
        self.render(&json)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let json = serde_json::json!({
            "acquisition": {
                "backend": status.acquisition_backend,
            },
            "openai": {
                "embedding_model": status.embedding_model,
                "dimension": status.embedding_dimension,
                "key_present": status.openai_key_present,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "url": status.vector_store_url,
                "connected": status.vector_store_connected,
                "collection": status.collection,
                "memes": status.stored_memes,
            }
        });
        self.render(&json)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemeMetadata;
    use uuid::Uuid;

    fn sample_response() -> SearchResponse {
        SearchResponse {
            memes: vec![MemeMetadata {
                url: "https://e.com/drake".to_string(),
                image_url: "https://e.com/drake.jpg".to_string(),
                title: "Drake Hotline Bling".to_string(),
                ai_description: "A two-panel reaction meme".to_string(),
            }],
            scores: vec![0.81],
        }
    }

    #[test]
    fn test_text_search_results() {
        let output = TextFormatter.format_search_results("drake", &sample_response(), 12);
        assert!(output.contains("Drake Hotline Bling"));
        assert!(output.contains("[Score: 0.810]"));
    }

    #[test]
    fn test_text_empty_results() {
        let output = TextFormatter.format_search_results("nothing", &SearchResponse::default(), 3);
        assert!(output.contains("No memes found"));
    }

    #[test]
    fn test_json_search_results_shape() {
        let output = JsonFormatter::new(false).format_search_results("drake", &sample_response(), 12);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["memes"][0]["imageUrl"], "https://e.com/drake.jpg");
        assert_eq!(json["scores"][0], 0.81_f32 as f64);
    }

    #[test]
    fn test_json_range_report_shape() {
        let mut report = RangeReport::new(1, 3);
        report.results.push(PageReport::empty(1, Uuid::nil()));
        let output = JsonFormatter::new(false).format_range_report(&report);
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["startPage"], 1);
        assert_eq!(json["completedPages"], 1);
        assert_eq!(json["failedPages"], 0);
        assert_eq!(json["results"][0]["runId"], Uuid::nil().to_string());
    }
}
