//! Server-rendered dashboard page
//!
//! One MiniJinja template renders the whole page. It is registered under an
//! `.html` name so every interpolated value is HTML-escaped. The summary and
//! transcript are markdown; they are rendered to HTML up front with any raw
//! HTML in them turned back into escaped text.

use crate::config::{fingerprint, ApiKeys, Backend, Theme};
use crate::error::DashboardError;
use crate::models::TranscriptEntry;
use crate::workflows::{Workflow, WorkflowReport};
use crate::Result;
use minijinja::{context, Environment};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use serde::Serialize;

pub const TITLE: &str = "FINROBOT /// AGENTIC ANALYST";
pub const CAPTION: &str = "INDIAN STOCK MARKET FOCUS // NSE & BSE";
pub const KEYS_FIRST: &str = "CONFIGURE API KEYS IN SIDEBAR FIRST.";

const PAGE_TEMPLATE_NAME: &str = "dashboard.html";

/// What happened on the last button press
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(WorkflowReport),
    Failed { workflow: Workflow, message: String },
}

impl RunOutcome {
    pub fn from_result(workflow: Workflow, result: Result<WorkflowReport>) -> Self {
        match result {
            Ok(report) => RunOutcome::Completed(report),
            Err(DashboardError::MissingKeys(_)) => RunOutcome::Failed {
                workflow,
                message: KEYS_FIRST.to_string(),
            },
            Err(e) => RunOutcome::Failed {
                workflow,
                message: format!("EXECUTION FAILED: {}", e),
            },
        }
    }

    pub fn workflow(&self) -> Workflow {
        match self {
            RunOutcome::Completed(report) => report.workflow,
            RunOutcome::Failed { workflow, .. } => *workflow,
        }
    }
}

/// Everything one page render needs
#[derive(Debug, Clone)]
pub struct PageView {
    keys: ApiKeys,
    active: Workflow,
    ticker: Option<String>,
    outcome: Option<RunOutcome>,
    notice: Option<String>,
}

impl PageView {
    pub fn new(keys: ApiKeys) -> Self {
        Self {
            keys,
            active: Workflow::Forecast,
            ticker: None,
            outcome: None,
            notice: None,
        }
    }

    pub fn with_tab(mut self, workflow: Workflow) -> Self {
        self.active = workflow;
        self
    }

    /// Ticker to pre-fill in the active tab instead of its default
    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_outcome(mut self, outcome: RunOutcome) -> Self {
        self.active = outcome.workflow();
        self.outcome = Some(outcome);
        self
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct KeyField {
    name: &'static str,
    label: String,
    help: &'static str,
    status: String,
}

#[derive(Debug, Serialize)]
struct TabView {
    slug: &'static str,
    label: &'static str,
    subheading: &'static str,
    input_label: &'static str,
    input_hint: &'static str,
    button_label: &'static str,
    progress_label: &'static str,
    ticker: String,
    active: bool,
    result: Option<ResultView>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResultView {
    banner: &'static str,
    heading: String,
    summary: String,
    log_label: &'static str,
    entries: Vec<EntryView>,
    model: String,
    turns: u32,
    elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
struct EntryView {
    role: String,
    name: String,
    tool_name: Option<String>,
    content: String,
}

impl EntryView {
    fn from_entry(entry: &TranscriptEntry) -> Option<Self> {
        if !entry.is_visible() {
            return None;
        }
        Some(Self {
            role: entry.role.to_string().to_uppercase(),
            name: entry.name.clone(),
            tool_name: entry.tool_name.clone(),
            content: render_markdown(entry.content.as_deref().unwrap_or_default()),
        })
    }
}

/// Template environment plus the theme the page is drawn in
pub struct Dashboard {
    env: Environment<'static>,
    theme: Theme,
    backend: Backend,
}

impl Dashboard {
    pub fn new(theme: Theme, backend: Backend) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
        Ok(Self {
            env,
            theme,
            backend,
        })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn render(&self, view: &PageView) -> Result<String> {
        let template = self.env.get_template(PAGE_TEMPLATE_NAME)?;

        let missing = view.keys.missing();
        let tabs: Vec<TabView> = Workflow::ALL
            .iter()
            .map(|&workflow| self.tab_view(workflow, view))
            .collect();

        let html = template.render(context! {
            title => TITLE,
            caption => CAPTION,
            theme => theme_name(self.theme),
            engine => self.backend.to_string().to_uppercase(),
            css => stylesheet(self.theme),
            key_fields => key_fields(&view.keys),
            missing => missing.join(", "),
            notice => view.notice.as_deref(),
            tabs => tabs,
        })?;
        Ok(html)
    }

    fn tab_view(&self, workflow: Workflow, view: &PageView) -> TabView {
        let active = workflow == view.active;
        let ticker = match (&view.ticker, &view.outcome) {
            (Some(t), _) if active => t.clone(),
            (_, Some(RunOutcome::Completed(report))) if report.workflow == workflow => {
                report.ticker.clone()
            }
            _ => workflow.default_ticker().to_string(),
        };

        let (result, error) = match &view.outcome {
            Some(RunOutcome::Completed(report)) if report.workflow == workflow => {
                (Some(result_view(report)), None)
            }
            Some(RunOutcome::Failed { workflow: w, message }) if *w == workflow => {
                (None, Some(message.clone()))
            }
            _ => (None, None),
        };

        TabView {
            slug: workflow.slug(),
            label: workflow.tab_label(),
            subheading: workflow.subheading(),
            input_label: workflow.input_label(),
            input_hint: workflow.input_hint(),
            button_label: workflow.button_label(),
            progress_label: workflow.progress_label(),
            ticker,
            active,
            result,
            error,
        }
    }
}

fn result_view(report: &WorkflowReport) -> ResultView {
    ResultView {
        banner: report.workflow.banner(),
        heading: report.heading(),
        summary: render_markdown(&report.chat.summary),
        log_label: report.workflow.log_label(),
        entries: report
            .chat
            .chat_history
            .iter()
            .filter_map(EntryView::from_entry)
            .collect(),
        model: report.model.clone(),
        turns: report.chat.turns,
        elapsed_ms: report.chat.elapsed_ms,
    }
}

/// Markdown to HTML for model output.
///
/// Raw HTML blocks and inline tags become text so they are escaped, and
/// script-capable link targets are dropped.
pub fn render_markdown(source: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if is_script_url(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

fn is_script_url(url: &str) -> bool {
    let scheme = url.trim_start().to_ascii_lowercase();
    ["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|s| scheme.starts_with(s))
}

fn key_fields(keys: &ApiKeys) -> Vec<KeyField> {
    let status = |secret: &str| {
        if secret.trim().is_empty() {
            "NOT SET".to_string()
        } else {
            format!("SET // {}", fingerprint(secret))
        }
    };

    vec![
        KeyField {
            name: "llm",
            label: format!("{} API KEY", keys.backend.key_label().to_uppercase()),
            help: model_hint(keys.backend),
            status: status(&keys.llm),
        },
        KeyField {
            name: "fmp",
            label: "FMP API KEY".to_string(),
            help: "Financial Modeling Prep",
            status: status(&keys.fmp),
        },
        KeyField {
            name: "finnhub",
            label: "FINNHUB API KEY".to_string(),
            help: "Finnhub Stock Data",
            status: status(&keys.finnhub),
        },
    ]
}

fn model_hint(backend: Backend) -> &'static str {
    match backend {
        Backend::Gemini => "For Gemini 1.5 Pro",
        Backend::Groq => "For Llama 3.3 70B on Groq",
    }
}

fn theme_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Brutalist => "brutalist",
        Theme::Terminal => "terminal",
    }
}

fn stylesheet(theme: Theme) -> &'static str {
    match theme {
        Theme::Brutalist => BRUTALIST_CSS,
        Theme::Terminal => TERMINAL_CSS,
    }
}

// =============================
// Templates
// =============================

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>FinRobot Agent</title>
<style>{{ css | safe }}</style>
</head>
<body class="theme-{{ theme }}">
<aside class="sidebar">
  <h2>SYSTEM CONFIG</h2>
  <hr>
  <form method="post" action="/keys" autocomplete="off">
    {% for field in key_fields %}
    <label for="key-{{ field.name }}">{{ field.label }}</label>
    <input id="key-{{ field.name }}" name="{{ field.name }}" type="password" placeholder="{{ field.status }}" title="{{ field.help }}">
    <small>{{ field.help }}</small>
    {% endfor %}
    <button type="submit">SAVE KEYS</button>
  </form>
  <hr>
  <p class="info">Ensure all keys are set for agents to function correctly.</p>
</aside>
<main>
  <h1>{{ title }}</h1>
  <p class="caption">{{ caption }}</p>
  <p class="meta">ENGINE: {{ engine }}</p>
  {% if notice %}<div class="notice">{{ notice }}</div>{% endif %}
  {% if missing %}<div class="warning">MISSING API KEYS: {{ missing }}</div>{% endif %}
  <nav class="tabs">
    {% for tab in tabs %}
    <a class="tab{% if tab.active %} active{% endif %}" href="/?tab={{ tab.slug }}">{{ tab.label }}</a>
    {% endfor %}
  </nav>
  {% for tab in tabs %}
  <section id="{{ tab.slug }}" class="panel"{% if not tab.active %} hidden{% endif %}>
    <h3>{{ tab.subheading }}</h3>
    <div class="columns">
      <form class="run" method="post" action="/{{ tab.slug }}" data-progress="{{ tab.progress_label }}">
        <label for="ticker-{{ tab.slug }}">{{ tab.input_label }}</label>
        <input id="ticker-{{ tab.slug }}" name="ticker" type="text" value="{{ tab.ticker }}" title="{{ tab.input_hint }}">
        <small>{{ tab.input_hint }}</small>
        <button type="submit">{{ tab.button_label }}</button>
        <p class="progress" hidden>{{ tab.progress_label }}</p>
      </form>
      <div class="output">
        {% if tab.error %}<div class="error">{{ tab.error }}</div>{% endif %}
        {% if tab.result %}
        <div class="success">{{ tab.result.banner }}</div>
        <h3>{{ tab.result.heading }}</h3>
        <div class="summary">{{ tab.result.summary | safe }}</div>
        <p class="meta">{{ tab.result.model }} // {{ tab.result.turns }} TURNS // {{ tab.result.elapsed_ms }} MS</p>
        <details class="log">
          <summary>{{ tab.result.log_label }}</summary>
          {% for entry in tab.result.entries %}
          <div class="entry">
            <p><strong>{{ entry.role }}:</strong> <span class="who">{{ entry.name }}{% if entry.tool_name %} [{{ entry.tool_name }}]{% endif %}</span></p>
            <div class="content">{{ entry.content | safe }}</div>
          </div>
          <hr>
          {% endfor %}
        </details>
        {% endif %}
      </div>
    </div>
  </section>
  {% endfor %}
</main>
<script>
document.querySelectorAll("form.run").forEach(function (form) {
  form.addEventListener("submit", function () {
    form.querySelector("button").disabled = true;
    form.querySelector(".progress").hidden = false;
  });
});
</script>
</body>
</html>
"#;

const BRUTALIST_CSS: &str = r#"
body { margin: 0; display: flex; min-height: 100vh; background: #ffffff; color: #000000; font-family: 'Courier New', Courier, monospace; }
main { flex: 1; padding: 24px 40px; }
.sidebar { width: 300px; padding: 24px; background: #f0f0f0; border-right: 4px solid #000000; }
.sidebar label, .run label { display: block; margin-top: 14px; font-weight: bold; }
.sidebar small, .run small { display: block; margin-top: 4px; color: #333333; }
h1, h2, h3 { color: #000000; text-transform: uppercase; font-weight: 900; text-shadow: 3px 3px 0px #FF00FF; }
.caption { font-weight: bold; color: #333333; }
button { margin-top: 16px; background: #FFDE00; color: #000000; border: 4px solid #000000; border-radius: 0; box-shadow: 6px 6px 0px 0px #000000; font-family: inherit; font-weight: bold; font-size: 16px; text-transform: uppercase; padding: 10px 20px; cursor: pointer; transition: all 0.1s; }
button:hover { transform: translate(-2px, -2px); box-shadow: 8px 8px 0px 0px #000000; }
button:active { transform: translate(2px, 2px); box-shadow: 2px 2px 0px 0px #000000; background: #00FFFF; }
input { width: 100%; box-sizing: border-box; padding: 8px; border: 3px solid #000000; border-radius: 0; box-shadow: 4px 4px 0px 0px #000000; background: #ffffff; color: #000000; font-family: inherit; font-weight: bold; }
input:focus { outline: none; border-color: #FF00FF; box-shadow: 6px 6px 0px 0px #000000; }
.tabs { display: flex; gap: 10px; margin: 20px 0; }
.tab { display: inline-block; padding: 14px 18px; background: #ffffff; color: #000000; border: 3px solid #000000; box-shadow: 4px 4px 0px 0px #000000; font-weight: bold; text-decoration: none; }
.tab.active { background: #FF00FF; color: #ffffff; transform: translate(-2px, -2px); box-shadow: 6px 6px 0px 0px #000000; }
.columns { display: grid; grid-template-columns: 1fr 2fr; gap: 32px; }
.warning, .error, .success, .notice, .info { padding: 12px 16px; border: 3px solid #000000; font-weight: bold; margin: 12px 0; }
.warning { background: #FFDE00; }
.error { background: #FF00FF; color: #ffffff; }
.success { background: #00FF66; }
.notice, .info { background: #00FFFF; }
.summary { border: 3px solid #000000; padding: 20px; box-shadow: 5px 5px 0px 0px #000000; }
.summary table, .entry table { border-collapse: collapse; }
.summary th, .summary td, .entry th, .entry td { border: 2px solid #000000; padding: 4px 8px; }
.meta { font-size: 12px; color: #555555; }
.log summary { border: 3px solid #000000; background: #00FFFF; color: #000000; font-weight: bold; box-shadow: 4px 4px 0px 0px #000000; padding: 8px 12px; cursor: pointer; }
.summary pre, .entry pre { white-space: pre-wrap; font-family: inherit; }
.progress { font-weight: bold; }
hr { border: none; border-top: 3px solid #000000; }
"#;

const TERMINAL_CSS: &str = r#"
body { margin: 0; display: flex; min-height: 100vh; background: #0b0f0c; color: #33ff66; font-family: 'Fira Code', 'Courier New', monospace; }
main { flex: 1; padding: 24px 40px; }
.sidebar { width: 300px; padding: 24px; background: #050805; border-right: 1px solid #1f7a3a; }
.sidebar label, .run label { display: block; margin-top: 14px; color: #a6ffbf; }
.sidebar small, .run small { display: block; margin-top: 4px; color: #4d9960; }
h1, h2, h3 { color: #33ff66; text-transform: uppercase; letter-spacing: 2px; text-shadow: 0 0 8px rgba(51, 255, 102, 0.6); }
.caption { color: #4d9960; }
button { margin-top: 16px; background: transparent; color: #33ff66; border: 1px solid #33ff66; font-family: inherit; font-size: 15px; text-transform: uppercase; padding: 10px 20px; cursor: pointer; }
button:hover { background: #33ff66; color: #0b0f0c; }
button:disabled { opacity: 0.5; cursor: wait; }
input { width: 100%; box-sizing: border-box; padding: 8px; background: #050805; color: #33ff66; border: 1px solid #1f7a3a; font-family: inherit; }
input:focus { outline: none; border-color: #33ff66; box-shadow: 0 0 6px rgba(51, 255, 102, 0.5); }
.tabs { display: flex; gap: 8px; margin: 20px 0; border-bottom: 1px solid #1f7a3a; }
.tab { padding: 10px 16px; color: #4d9960; text-decoration: none; border: 1px solid transparent; border-bottom: none; }
.tab.active { color: #0b0f0c; background: #33ff66; }
.columns { display: grid; grid-template-columns: 1fr 2fr; gap: 32px; }
.warning, .error, .success, .notice, .info { padding: 10px 14px; border-left: 4px solid; margin: 12px 0; background: #0f1a12; }
.warning { border-color: #ffcc00; color: #ffcc00; }
.error { border-color: #ff3355; color: #ff6680; }
.success { border-color: #33ff66; }
.notice, .info { border-color: #33ccff; color: #66d9ff; }
.summary { border: 1px solid #1f7a3a; padding: 20px; background: #050805; }
.summary table, .entry table { border-collapse: collapse; }
.summary th, .summary td, .entry th, .entry td { border: 1px solid #1f7a3a; padding: 4px 8px; }
.meta { font-size: 12px; color: #4d9960; }
.log summary { color: #a6ffbf; cursor: pointer; padding: 8px 0; }
.entry .content { color: #a6ffbf; }
.summary pre, .entry pre { white-space: pre-wrap; font-family: inherit; }
.progress { color: #ffcc00; }
hr { border: none; border-top: 1px dashed #1f7a3a; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatResult, Role};
    use uuid::Uuid;

    fn full_keys() -> ApiKeys {
        ApiKeys::new(Backend::Gemini, "g-key".into(), "m-key".into(), "f-key".into())
    }

    fn report(summary: &str) -> WorkflowReport {
        WorkflowReport {
            workflow: Workflow::Forecast,
            ticker: "RELIANCE.NS".into(),
            model: "gemini-1.5-pro".into(),
            chat: ChatResult {
                chat_id: Uuid::new_v4(),
                summary: summary.into(),
                chat_history: vec![
                    TranscriptEntry {
                        role: Role::User,
                        name: "User_Proxy".into(),
                        content: Some("Use all tools".into()),
                        tool_name: None,
                    },
                    TranscriptEntry {
                        role: Role::Assistant,
                        name: "Market_Analyst".into(),
                        content: None,
                        tool_name: Some("get_company_news".into()),
                    },
                    TranscriptEntry {
                        role: Role::Tool,
                        name: "User_Proxy".into(),
                        content: Some("Reliance Q2 profit rises".into()),
                        tool_name: Some("get_company_news".into()),
                    },
                ],
                turns: 2,
                elapsed_ms: 4200,
            },
        }
    }

    #[test]
    fn test_render_empty_page() {
        let dashboard = Dashboard::new(Theme::Brutalist, Backend::Gemini).unwrap();
        let keys = ApiKeys::new(Backend::Gemini, String::new(), "m".into(), String::new());
        let html = dashboard.render(&PageView::new(keys)).unwrap();

        // '/' is escaped by the html auto-escaper, so match around it
        assert!(html.contains("AGENTIC ANALYST"));
        assert!(html.contains("NSE &amp; BSE"));
        assert!(html.contains("SYSTEM CONFIG"));
        assert!(html.contains("GOOGLE API KEY"));
        assert!(html.contains("MISSING API KEYS: Google, Finnhub"));
        assert!(html.contains("MARKET FORECASTER"));
        assert!(html.contains("ANNUAL REPORT ANALYZER"));
        assert!(html.contains(r#"value="RELIANCE.NS""#));
        assert!(html.contains(r#"value="TCS.NS""#));
        assert!(html.contains("#FFDE00"));
        assert!(!html.contains("ANALYSIS COMPLETE"));
    }

    #[test]
    fn test_render_completed_run() {
        let dashboard = Dashboard::new(Theme::Brutalist, Backend::Gemini).unwrap();
        let view = PageView::new(full_keys())
            .with_outcome(RunOutcome::Completed(report("Expect <b>+2%</b> next week")));
        let html = dashboard.render(&view).unwrap();

        assert!(!html.contains("MISSING API KEYS"));
        assert!(html.contains("ANALYSIS COMPLETE"));
        assert!(html.contains("FORECAST REPORT"));
        assert!(html.contains("VIEW FULL CONVERSATION LOG"));
        assert!(html.contains("Expect &lt;b&gt;+2%"));
        assert!(!html.contains("<b>+2%"));
        assert!(html.contains("<strong>USER:</strong>"));
        assert!(html.contains("<strong>TOOL:</strong>"));
        assert!(html.contains("Reliance Q2 profit rises"));
        // the assistant entry had no text and is left out of the log
        assert!(!html.contains("<strong>ASSISTANT:</strong>"));
        // keys are never echoed back
        assert!(!html.contains("g-key"));
    }

    #[test]
    fn test_summary_markdown_is_rendered() {
        let dashboard = Dashboard::new(Theme::Brutalist, Backend::Gemini).unwrap();
        let summary = "## Outlook\n\n**Buy** on dips.\n\n| Metric | FY24 |\n|---|---|\n| Margin | 21% |\n\n<script>alert(1)</script>\n";
        let html = dashboard
            .render(&PageView::new(full_keys()).with_outcome(RunOutcome::Completed(report(summary))))
            .unwrap();

        assert!(html.contains("<h2>Outlook</h2>"));
        assert!(html.contains("<strong>Buy</strong> on dips."));
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Margin</td>"));
        assert!(html.contains("&lt;script&gt;alert(1)"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn test_markdown_neutralizes_html_and_script_links() {
        let html = render_markdown("Hi <img src=x onerror=alert(1)> [site](javascript:alert(1))");
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img"));
        assert!(html.contains(r##"<a href="#">site</a>"##));
        assert!(!html.contains("javascript:"));

        let html = render_markdown("- **Revenue** up\n- *Debt* flat");
        assert!(html.contains("<li><strong>Revenue</strong> up</li>"));
        assert!(html.contains("<em>Debt</em>"));
    }

    #[test]
    fn test_render_failures() {
        let dashboard = Dashboard::new(Theme::Terminal, Backend::Groq).unwrap();

        let missing = RunOutcome::from_result(
            Workflow::Report,
            Err(DashboardError::MissingKeys(vec!["FMP".into()])),
        );
        let html = dashboard
            .render(&PageView::new(full_keys()).with_outcome(missing))
            .unwrap();
        assert!(html.contains(KEYS_FIRST));
        assert!(html.contains("theme-terminal"));
        assert!(html.contains("ENGINE: GROQ"));
        assert!(!html.contains("#FFDE00"));

        let failed = RunOutcome::from_result(
            Workflow::Report,
            Err(DashboardError::LlmError("Groq API returned 401".into())),
        );
        let html = dashboard
            .render(&PageView::new(full_keys()).with_outcome(failed))
            .unwrap();
        assert!(html.contains("EXECUTION FAILED: LLM error: Groq API returned 401"));
    }

    #[test]
    fn test_key_fields_follow_backend() {
        let keys = ApiKeys::new(Backend::Groq, "secret".into(), String::new(), String::new());
        let fields = key_fields(&keys);
        assert_eq!(fields[0].label, "GROQ API KEY");
        assert!(fields[0].status.starts_with("SET // "));
        assert!(!fields[0].status.contains("secret"));
        assert_eq!(fields[1].status, "NOT SET");
    }

    #[test]
    fn test_submitted_ticker_is_kept() {
        let dashboard = Dashboard::new(Theme::Brutalist, Backend::Gemini).unwrap();
        let view = PageView::new(full_keys())
            .with_tab(Workflow::Report)
            .with_ticker("\"><script>");
        let html = dashboard.render(&view).unwrap();
        assert!(!html.contains("\"><script>"));
        assert!(html.contains(r#"value="RELIANCE.NS""#));
    }
}
