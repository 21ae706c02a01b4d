//! Prompt construction and output filtering for document-set summaries.
//!
//! The model is asked for one `**title**: description` paragraph per document. Its reply
//! is treated as untrusted: reasoning blocks are dropped, only lines in the requested
//! shape are kept, and those lines are HTML-escaped before the single supported markup
//! construct (`**bold**`) is converted to `<strong>`.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{ModelReply, Notice, SummaryStatus};
use crate::summarization::{ChatClient, ChatRequest};

/// Summary text returned when the model call fails.
pub const ERROR_SUMMARY: &str = "Error generating summary.";
/// Summary text returned when no line of the reply has the expected shape.
pub const NO_VALID_SUMMARY: &str = "No valid summaries generated.";
/// Summary text returned for a set without documents.
pub const EMPTY_SET_SUMMARY: &str = "No documents to summarize.";

static REASONING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?(?:</think>|\z)").expect("valid regex"));
static SUMMARY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*(.+?)\*\*:").expect("valid regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));

/// Rendered pipeline result before it is attached to a document set.
#[derive(Debug, Clone)]
pub(crate) struct RenderedSummary {
    pub(crate) summary: String,
    pub(crate) status: SummaryStatus,
    pub(crate) notices: Vec<Notice>,
}

/// Build the single user message sent to the model.
///
/// Titles are appended verbatim, comma separated.
pub fn build_summary_prompt(titles: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are given the titles of the documents in a collection. \
         Write exactly one paragraph for each title, in the order given.\n",
    );
    prompt.push_str(
        "Begin every paragraph with the title in bold markup, immediately followed by a colon, \
         then one or two sentences describing the likely subject in a technical, academic register.\n",
    );
    prompt.push_str(
        "Do not number the paragraphs. Do not include reasoning, <think> tags, headings, \
         introductions, closing remarks, or any other text. Output only the paragraphs, one per line.\n\n",
    );
    prompt.push_str("Example format:\n");
    prompt.push_str(
        "**Attention Is All You Need.pdf**: Introduces the Transformer, a sequence transduction \
         architecture built entirely on attention mechanisms.\n",
    );
    prompt.push_str(
        "**Deep Residual Learning.pdf**: Presents residual connections that make very deep \
         convolutional networks trainable.\n\n",
    );
    prompt.push_str("Titles: ");
    prompt.push_str(&titles.join(", "));
    prompt
}

/// Remove `<think>…</think>` blocks, including an unterminated trailing one.
pub fn strip_reasoning(raw: &str) -> String {
    REASONING_BLOCK.replace_all(raw, "").into_owned()
}

/// Lines of `text` shaped like `**title**: rest`, trimmed, in order.
pub fn filter_summary_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| SUMMARY_LINE.is_match(line))
        .collect()
}

/// Convert each `**text**` pair to `<strong>text</strong>`; everything else is untouched.
pub fn bold_to_strong(text: &str) -> String {
    BOLD.replace_all(text, "<strong>$1</strong>").into_owned()
}

/// Turn a raw model reply into display HTML, or `None` when no line survives filtering.
pub fn render_summary(raw: &str) -> Option<String> {
    let cleaned = strip_reasoning(raw);
    let lines = filter_summary_lines(&cleaned);
    if lines.is_empty() {
        return None;
    }

    let fragments: Vec<String> = lines
        .into_iter()
        .map(|line| {
            let escaped = html_escape::encode_text(line);
            format!("<p>{}</p><br>", bold_to_strong(&escaped))
        })
        .collect();
    Some(fragments.join("\n"))
}

/// Map the model call result onto summary text, status, and notices.
pub(crate) fn render_model_reply(reply: ModelReply) -> RenderedSummary {
    match reply {
        Ok(content) => match render_summary(&content) {
            Some(summary) => RenderedSummary {
                summary,
                status: SummaryStatus::Generated,
                notices: Vec::new(),
            },
            None => {
                tracing::info!(
                    reply_chars = content.len(),
                    "Model reply contained no summary lines"
                );
                RenderedSummary {
                    summary: NO_VALID_SUMMARY.to_string(),
                    status: SummaryStatus::NoValidLines,
                    notices: Vec::new(),
                }
            }
        },
        Err(error) => {
            tracing::warn!(error = %error, "Summary generation failed");
            RenderedSummary {
                summary: ERROR_SUMMARY.to_string(),
                status: SummaryStatus::Failed,
                notices: vec![Notice::error(error.to_string())],
            }
        }
    }
}

/// Run the model over `titles` and render the reply.
///
/// An empty title list short-circuits without contacting the model.
pub(crate) async fn summarize_titles(
    client: &dyn ChatClient,
    model: &str,
    titles: &[String],
) -> RenderedSummary {
    if titles.is_empty() {
        return RenderedSummary {
            summary: EMPTY_SET_SUMMARY.to_string(),
            status: SummaryStatus::EmptySet,
            notices: Vec::new(),
        };
    }

    let prompt = build_summary_prompt(titles);
    let reply = client
        .chat(ChatRequest {
            model: model.to_string(),
            prompt,
        })
        .await
        .map(|response| response.content);
    render_model_reply(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarization::{ChatClientError, ChatResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedClient {
        reply: Mutex<Option<Result<String, ChatClientError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(reply: Result<String, ChatClientError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatClientError> {
            self.prompts.lock().expect("lock").push(request.prompt);
            self.reply
                .lock()
                .expect("lock")
                .take()
                .expect("single call")
                .map(|content| ChatResponse {
                    model: request.model,
                    content,
                })
        }
    }

    #[test]
    fn filter_keeps_only_bold_colon_lines() {
        let raw = "**A.pdf**: desc one\njunk line\n**B.pdf**: desc two";
        let rendered = render_summary(raw).expect("summary");

        assert_eq!(rendered.matches("<p>").count(), 2);
        assert!(rendered.contains("<strong>A.pdf</strong>: desc one"));
        assert!(rendered.contains("<strong>B.pdf</strong>: desc two"));
        assert!(!rendered.contains("junk line"));
    }

    #[test]
    fn each_fragment_is_a_block_with_line_break() {
        let rendered = render_summary("**A.pdf**: desc").expect("summary");
        assert_eq!(rendered, "<p><strong>A.pdf</strong>: desc</p><br>");
    }

    #[test]
    fn lines_without_bold_prefix_or_colon_are_dropped() {
        let raw = "1. **A.pdf**: numbered\n**B.pdf** missing colon\n****: empty title\nHere you go:";
        assert!(filter_summary_lines(raw).is_empty());
        assert!(render_summary(raw).is_none());
    }

    #[test]
    fn zero_matching_lines_yield_fallback() {
        let rendered = render_model_reply(Ok("Sure! Here are the summaries.".into()));
        assert_eq!(rendered.summary, NO_VALID_SUMMARY);
        assert_eq!(rendered.summary, "No valid summaries generated.");
        assert_eq!(rendered.status, SummaryStatus::NoValidLines);
    }

    #[test]
    fn bold_transform_only_touches_delimited_text() {
        assert_eq!(bold_to_strong("**Bold**: rest"), "<strong>Bold</strong>: rest");
        assert_eq!(bold_to_strong("plain: text * star"), "plain: text * star");
    }

    #[test]
    fn reasoning_blocks_are_removed_before_filtering() {
        let raw = "<think>\n**Fake.pdf**: internal musing\n</think>\n**Real.pdf**: kept";
        let rendered = render_summary(raw).expect("summary");
        assert!(rendered.contains("Real.pdf"));
        assert!(!rendered.contains("Fake.pdf"));

        let unterminated = "**A.pdf**: kept\n<think>\n**B.pdf**: cut off";
        let rendered = render_summary(unterminated).expect("summary");
        assert!(!rendered.contains("B.pdf"));
    }

    #[test]
    fn model_markup_is_escaped() {
        let raw = "**<script>alert(1)</script>**: <img src=x onerror=alert(1)>";
        let rendered = render_summary(raw).expect("summary");
        assert!(!rendered.contains("<script>"));
        assert!(!rendered.contains("<img"));
        assert!(rendered.contains("&lt;script&gt;"));
    }

    #[test]
    fn prompt_lists_titles_verbatim() {
        let titles = vec!["A.pdf".to_string(), "**B**: injected.pdf".to_string()];
        let prompt = build_summary_prompt(&titles);
        assert!(prompt.ends_with("Titles: A.pdf, **B**: injected.pdf"));
        assert!(prompt.contains("Do not number"));
        assert!(prompt.contains("**Attention Is All You Need.pdf**:"));
    }

    #[test]
    fn model_failure_returns_fixed_text_and_notice() {
        let rendered = render_model_reply(Err(ChatClientError::ProviderUnavailable(
            "connection refused".into(),
        )));
        assert_eq!(rendered.summary, "Error generating summary.");
        assert_eq!(rendered.status, SummaryStatus::Failed);
        assert_eq!(rendered.notices.len(), 1);
        assert!(rendered.notices[0].text.contains("connection refused"));
    }

    #[tokio::test]
    async fn summarize_titles_sends_prompt_and_renders_reply() {
        let client = ScriptedClient::new(Ok("**A.pdf**: about A".into()));
        let titles = vec!["A.pdf".to_string()];

        let rendered = summarize_titles(&client, "deepseek-r1", &titles).await;

        assert_eq!(rendered.status, SummaryStatus::Generated);
        assert_eq!(rendered.summary, "<p><strong>A.pdf</strong>: about A</p><br>");
        let prompts = client.prompts.lock().expect("lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].ends_with("Titles: A.pdf"));
    }

    #[tokio::test]
    async fn empty_title_list_skips_model_call() {
        let client = ScriptedClient::new(Ok("unused".into()));

        let rendered = summarize_titles(&client, "deepseek-r1", &[]).await;

        assert_eq!(rendered.summary, EMPTY_SET_SUMMARY);
        assert_eq!(rendered.status, SummaryStatus::EmptySet);
        assert!(client.prompts.lock().expect("lock").is_empty());
    }
}
