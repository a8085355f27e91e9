//! Report assembly.
//!
//! Outcomes are recorded per (deal type, watchlist category) key and laid out
//! categories-outer, deal-types-inner at build time, so the order in which
//! outcomes arrive does not matter.

use std::collections::HashMap;

use chrono::NaiveDate;
use deal_core::{feed_date_string, human_date_string, DealError, DealRecord, DealType, Document};

pub type SectionOutcome = Result<Vec<DealRecord>, DealError>;

const TABLE_COLUMNS: [&str; 6] = [
    "Date",
    "Symbol",
    "Client Name",
    "Buy/Sell",
    "Quantity Traded",
    "Trade Price",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Table(Vec<DealRecord>),
    NoMatches,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub deal_type: DealType,
    pub category: String,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub report_date: NaiveDate,
    pub categories: Vec<String>,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    report_date: NaiveDate,
    outcomes: HashMap<(DealType, String), SectionOutcome>,
}

impl ReportBuilder {
    pub fn new(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            outcomes: HashMap::new(),
        }
    }

    /// Record the outcome of one unit. A later record for the same key wins.
    pub fn record(&mut self, deal_type: DealType, category: &str, outcome: SectionOutcome) {
        self.outcomes.insert((deal_type, category.to_string()), outcome);
    }

    pub fn build<S: AsRef<str>>(&self, categories: &[S]) -> Report {
        let mut sections = Vec::with_capacity(categories.len() * DealType::ALL.len());

        for category in categories {
            let category = category.as_ref();
            for deal_type in DealType::ALL {
                let body = match self.outcomes.get(&(deal_type, category.to_string())) {
                    Some(Ok(records)) if records.is_empty() => SectionBody::NoMatches,
                    Some(Ok(records)) => SectionBody::Table(records.clone()),
                    Some(Err(e)) => SectionBody::Error(e.to_string()),
                    None => SectionBody::Error("no result was recorded for this section".into()),
                };
                sections.push(ReportSection {
                    deal_type,
                    category: category.to_string(),
                    body,
                });
            }
        }

        Report {
            report_date: self.report_date,
            categories: categories.iter().map(|c| c.as_ref().to_string()).collect(),
            sections,
        }
    }
}

impl Report {
    pub fn title(&self) -> String {
        format!(
            "Mutual Fund Deal Tracker - {}",
            human_date_string(self.report_date)
        )
    }

    pub fn error_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| matches!(s.body, SectionBody::Error(_)))
            .count()
    }

    pub fn match_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| match &s.body {
                SectionBody::Table(records) => records.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn render(&self) -> Document {
        let title = self.title();
        let mut body = format!("<h2>{}</h2>\n", escape_html(&title));

        for category in &self.categories {
            body.push_str(&format!("<h3>{} Watchlist</h3>\n", escape_html(category)));
            for section in self.sections.iter().filter(|s| &s.category == category) {
                body.push_str(&render_section(section));
                body.push('\n');
            }
        }

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8">{STYLE}</head>
<body>
{body}</body>
</html>"#
        );

        Document { title, html }
    }
}

const STYLE: &str = r#"<style>
body { font-family: Arial, sans-serif; line-height: 1.6; padding: 20px; }
.styled-table { border-collapse: collapse; font-size: 14px; min-width: 400px; border: 1px solid #ddd; }
.styled-table th, .styled-table td { border: 1px solid #ddd; padding: 8px; }
.styled-table th { background-color: #f2f2f2; }
.notice-error { color: #b91c1c; }
</style>"#;

fn render_section(section: &ReportSection) -> String {
    let deal_type = section.deal_type.label();
    let category = escape_html(&section.category);

    match &section.body {
        SectionBody::Table(records) => format!(
            "<h3>{deal_type} Deals - {category}</h3>\n{}",
            render_table(records)
        ),
        SectionBody::NoMatches => format!(
            "<p>No mutual fund deals in <b>{deal_type}</b> list for <b>{category}</b>.</p>"
        ),
        SectionBody::Error(message) => format!(
            r#"<p class="notice-error"><b>Error in {} deals for {category}:</b> {}</p>"#,
            deal_type.to_lowercase(),
            escape_html(message)
        ),
    }
}

fn render_table(records: &[DealRecord]) -> String {
    let mut html = String::from("<table class=\"styled-table\">\n<thead><tr>");
    for column in TABLE_COLUMNS {
        html.push_str(&format!("<th>{column}</th>"));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for r in records {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            feed_date_string(r.trade_date),
            escape_html(&r.symbol),
            escape_html(&r.client_name),
            r.side,
            r.quantity,
            r.price
        ));
    }

    html.push_str("</tbody>\n</table>");
    html
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
