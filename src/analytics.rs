//! Resumen agregado de las quejas registradas para el panel de administración.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::features::tokenize;
use crate::models::{Complaint, SentimentLabel};

const TOP_KEYWORDS: usize = 10;
const UNCLASSIFIED: &str = "Unclassified";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_complaints: usize,
    pub ai_analyzed: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_department: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub by_sentiment: BTreeMap<String, usize>,
    pub daily_trend: Vec<DailyCount>,
    pub top_keywords: Vec<KeywordCount>,
}

fn count_by<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

fn label_or_unclassified(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or(UNCLASSIFIED)
}

pub fn summarize(complaints: &[Complaint]) -> AnalyticsSummary {
    let by_category = count_by(complaints.iter().map(|c| label_or_unclassified(&c.category)));
    let by_department = count_by(complaints.iter().map(|c| label_or_unclassified(&c.department)));
    let by_priority = count_by(complaints.iter().map(|c| label_or_unclassified(&c.priority)));
    let by_status = count_by(complaints.iter().map(|c| c.status.as_str()));
    let by_sentiment = count_by(complaints.iter().filter_map(|c| c.sentiment).map(|s| match s {
        SentimentLabel::Positive => "Positive",
        SentimentLabel::Neutral => "Neutral",
        SentimentLabel::Negative => "Negative",
    }));

    let daily: BTreeMap<String, usize> = complaints
        .iter()
        .map(|c| c.created_at.format("%Y-%m-%d").to_string())
        .fold(BTreeMap::new(), |mut acc, day| {
            *acc.entry(day).or_insert(0) += 1;
            acc
        });
    let daily_trend = daily
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect();

    AnalyticsSummary {
        total_complaints: complaints.len(),
        ai_analyzed: complaints.iter().filter(|c| c.ai_analyzed).count(),
        by_category,
        by_department,
        by_priority,
        by_status,
        by_sentiment,
        daily_trend,
        top_keywords: top_keywords(complaints),
    }
}

fn top_keywords(complaints: &[Complaint]) -> Vec<KeywordCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for complaint in complaints {
        for token in tokenize(&complaint.description) {
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<KeywordCount> = counts
        .into_iter()
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    ranked.truncate(TOP_KEYWORDS);
    ranked
}
