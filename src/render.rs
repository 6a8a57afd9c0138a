//! Turns conversation history into display units and the HTML transcript page.
//!
//! Rendering is pure: the whole history is re-rendered on every round trip, so the
//! same turn must always produce the same output.

use serde::Serialize;
use std::fmt::Write;
use uuid::Uuid;

use crate::assessment::{AssessmentField, Reply};
use crate::session::{Role, Turn};

/// Placeholder for fields the model left out
pub const NOT_SPECIFIED: &str = "not specified";

pub const USER_LABEL: &str = "คุณ";
pub const BOT_LABEL: &str = "บอท";
pub const ASSESSMENT_HEADING: &str = "ผลการประเมินอาการปวด";

const PAGE_TITLE: &str = "แชตบอตดูแลอาการปวดมะเร็ง";
const PAGE_SUBTITLE: &str = "ช่วยประเมินและจัดการอาการปวดตาม PainAD & ECS-CP";
const INPUT_PLACEHOLDER: &str = "พิมพ์ลักษณะอาการปวด สีหน้า ท่าทาง หรือสิ่งที่ผู้ป่วยแสดงออก...";
const SUBMIT_LABEL: &str = "ส่งข้อความ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayField {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayUnit {
    UserText { label: &'static str, text: String },
    Assessment {
        heading: &'static str,
        fields: Vec<DisplayField>,
    },
    AssistantText { label: &'static str, text: String },
}

impl DisplayUnit {
    /// Value shown for `key`, if this is a structured assessment
    pub fn field(&self, key: &str) -> Option<&str> {
        match self {
            DisplayUnit::Assessment { fields, .. } => fields
                .iter()
                .find(|f| f.key == key)
                .map(|f| f.value.as_str()),
            _ => None,
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            DisplayUnit::UserText { label, text } => format!(
                "<div class=\"turn user\"><strong>🧑‍⚕️ {}:</strong> {}</div>",
                escape_html(label),
                escape_html(text)
            ),
            DisplayUnit::AssistantText { label, text } => format!(
                "<div class=\"turn bot\"><strong>🤖 {}:</strong> {}</div>",
                escape_html(label),
                escape_html(text)
            ),
            DisplayUnit::Assessment { heading, fields } => {
                let mut html = format!(
                    "<div class=\"turn assessment\"><h4>🤖 {}</h4><dl>",
                    escape_html(heading)
                );
                for f in fields {
                    let _ = write!(
                        html,
                        "<div class=\"metric {}\"><dt>{}</dt><dd>{}</dd></div>",
                        f.key,
                        escape_html(f.label),
                        escape_html(&f.value)
                    );
                }
                html.push_str("</dl></div>");
                html
            }
        }
    }
}

pub fn render(turn: &Turn) -> DisplayUnit {
    match turn.role {
        Role::User => DisplayUnit::UserText {
            label: USER_LABEL,
            text: turn.content.clone(),
        },
        Role::Assistant => match Reply::parse(&turn.content) {
            Reply::Structured(payload) => DisplayUnit::Assessment {
                heading: ASSESSMENT_HEADING,
                fields: AssessmentField::ALL
                    .iter()
                    .map(|&field| DisplayField {
                        key: field.key(),
                        label: field.label(),
                        value: payload.get(field).unwrap_or(NOT_SPECIFIED).to_string(),
                    })
                    .collect(),
            },
            Reply::Raw(text) => DisplayUnit::AssistantText {
                label: BOT_LABEL,
                text,
            },
        },
    }
}

pub fn render_history(history: &[Turn]) -> Vec<DisplayUnit> {
    history.iter().map(render).collect()
}

/// Transient message shown above the form; never part of the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Warning(String),
    Error(String),
}

pub fn render_page(session_id: Uuid, history: &[Turn], notice: Option<&Notice>) -> String {
    let mut html = String::with_capacity(4096);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"th\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>AI Cancer Pain Care Bot</title>\n<style>{style}</style>\n</head>\n<body>\n\
         <h1>💊 {}</h1>\n<h3>{}</h3>\n",
        escape_html(PAGE_TITLE),
        escape_html(PAGE_SUBTITLE),
        style = STYLE
    );

    let _ = write!(
        html,
        "<form method=\"post\" action=\"/chat/{session_id}\" class=\"chat-form\">\n\
         <label for=\"query\">🗣️ {}:</label>\n\
         <input type=\"text\" id=\"query\" name=\"query\" placeholder=\"{}\" autofocus>\n\
         <button type=\"submit\">🚀 {}</button>\n</form>\n",
        escape_html(USER_LABEL),
        escape_html(INPUT_PLACEHOLDER),
        escape_html(SUBMIT_LABEL)
    );

    match notice {
        Some(Notice::Warning(msg)) => {
            let _ = writeln!(html, "<div class=\"notice warning\">⚠️ {}</div>", escape_html(msg));
        }
        Some(Notice::Error(msg)) => {
            let _ = writeln!(html, "<div class=\"notice error\">❌ {}</div>", escape_html(msg));
        }
        None => {}
    }

    html.push_str("<div class=\"transcript\">\n");
    for unit in render_history(history) {
        html.push_str(&unit.to_html());
        html.push('\n');
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

const STYLE: &str = "body{background:#000;color:#fff;font-family:sans-serif;max-width:60rem;margin:auto;padding:1rem}\
.chat-form{background:#1a1a1a;padding:2rem;border-radius:12px}\
.chat-form input{width:70%}\
.turn{margin:1rem 0}\
.assessment dl{display:grid;grid-template-columns:1fr 1fr;gap:.5rem}\
.notice.warning{color:#fc3}.notice.error{color:#f66}";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
