//! Display model of a finished structured response, independent of styling.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::api::StructuredResponse;
use crate::core::rich_text::resolve_renderable_image_src;

pub const SUMMARY_TITLE: &str = "Response Summary";
pub const RAG_ROUTE_PREFIX: &str = "route.rag:";
pub const MCP_ROUTE_PREFIX: &str = "route.mcp:";

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryImage {
    pub alt: String,
    /// Normalized source (`data/imagery/..` already mapped to `/imagery/..`).
    pub src: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryItem {
    pub text: String,
    pub image: Option<SummaryImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarySection {
    pub title: &'static str,
    pub details: Vec<String>,
    pub error: Option<String>,
    pub items: Vec<SummaryItem>,
}

impl SummarySection {
    fn new(title: &'static str) -> Self {
        Self {
            title,
            details: Vec::new(),
            error: None,
            items: Vec::new(),
        }
    }
}

/// Pipeline, RAG and MCP sections; the answer itself is rendered separately
/// because it carries inline images.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSummary {
    pub pipeline: SummarySection,
    pub rag: SummarySection,
    pub mcp: SummarySection,
}

impl ResponseSummary {
    pub fn sections(&self) -> [&SummarySection; 3] {
        [&self.pipeline, &self.rag, &self.mcp]
    }
}

pub fn summarize(response: &StructuredResponse) -> ResponseSummary {
    let trace = &response.trace;

    let mut pipeline = SummarySection::new("Pipeline");
    pipeline.details.push(trace.tools.join(", "));
    pipeline.details.push(format!("latency: {} ms", trace.latency_ms));

    let mut rag = SummarySection::new("RAG");
    rag.details.push(format!(
        "decision: {}",
        trace.route_decision(RAG_ROUTE_PREFIX).unwrap_or("route.rag:false")
    ));
    rag.details
        .push(format!("hits: {}", response.citations.len()));
    rag.items = response
        .citations
        .iter()
        .map(|citation| SummaryItem {
            text: format!(
                "{} | {} | score={}",
                citation.doc_id,
                citation.location_label(),
                citation.score
            ),
            image: None,
        })
        .collect();

    let analysis = &response.analysis;
    let mut mcp = SummarySection::new("MCP");
    mcp.details.push(format!(
        "decision: {}",
        trace.route_decision(MCP_ROUTE_PREFIX).unwrap_or("route.mcp:false")
    ));
    let op_names = analysis
        .ops
        .iter()
        .map(|op| op.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    mcp.details.push(format!(
        "ops: {}",
        if op_names.is_empty() { "(none)" } else { op_names.as_str() }
    ));
    mcp.error = analysis
        .error
        .as_ref()
        .filter(|error| !error.is_empty())
        .map(|error| format!("error: {error}"));
    mcp.items = analysis
        .ops
        .iter()
        .map(|op| SummaryItem {
            text: format!(
                "{}: {} | stats={}",
                op.name,
                op.summary,
                stats_json(&op.stats)
            ),
            image: op
                .artifact_uri
                .as_deref()
                .map(resolve_renderable_image_src)
                .filter(|src| !src.is_empty())
                .map(|src| SummaryImage {
                    alt: format!("{}-artifact", op.name),
                    src,
                }),
        })
        .collect();

    ResponseSummary { pipeline, rag, mcp }
}

/// Compact JSON for op stats. Whole numbers print without a fraction and
/// non-finite values become `null`.
fn stats_json(stats: &BTreeMap<String, f64>) -> String {
    let map: Map<String, Value> = stats
        .iter()
        .map(|(key, &value)| {
            let value = if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
                Value::from(value as i64)
            } else {
                Value::from(value)
            };
            (key.clone(), value)
        })
        .collect();
    Value::Object(map).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AnalysisOp, AnalysisResult, Citation, TraceInfo};

    fn sample() -> StructuredResponse {
        StructuredResponse {
            answer: "Two craters.".into(),
            trace: TraceInfo {
                tools: vec![
                    "route.rag:true".into(),
                    "route.mcp:true".into(),
                    "llm.generate.stream".into(),
                ],
                latency_ms: 812,
            },
            citations: vec![
                Citation {
                    doc_id: "moon.md".into(),
                    chunk_id: "c1".into(),
                    score: 0.91,
                    line_start: Some(3),
                    line_end: Some(9),
                    ..Default::default()
                },
                Citation {
                    doc_id: "mars.md".into(),
                    chunk_id: "c4".into(),
                    score: 0.5,
                    ..Default::default()
                },
            ],
            analysis: AnalysisResult {
                invoked: true,
                ops: vec![AnalysisOp {
                    name: "edges".into(),
                    summary: "found 2 rims".into(),
                    stats: BTreeMap::from([("count".to_string(), 2.5)]),
                    artifact_uri: Some("data/imagery/edges.png".into()),
                }],
                error: Some("histogram timed out".into()),
            },
        }
    }

    #[test]
    fn sections_follow_trace_and_citations() {
        let summary = summarize(&sample());

        assert_eq!(
            summary.pipeline.details,
            vec![
                "route.rag:true, route.mcp:true, llm.generate.stream".to_string(),
                "latency: 812 ms".to_string()
            ]
        );
        assert_eq!(
            summary.rag.details,
            vec!["decision: route.rag:true".to_string(), "hits: 2".to_string()]
        );
        assert_eq!(
            summary.rag.items[0].text,
            "moon.md | lines 3-9 | score=0.91"
        );
        assert_eq!(summary.rag.items[1].text, "mars.md | c4 | score=0.5");
    }

    #[test]
    fn mcp_section_lists_ops_with_artifacts() {
        let summary = summarize(&sample());

        assert_eq!(summary.mcp.details[1], "ops: edges");
        assert_eq!(summary.mcp.error.as_deref(), Some("error: histogram timed out"));
        assert_eq!(summary.mcp.items.len(), 1);
        assert_eq!(
            summary.mcp.items[0].text,
            r#"edges: found 2 rims | stats={"count":2.5}"#
        );
        assert_eq!(
            summary.mcp.items[0].image,
            Some(SummaryImage {
                alt: "edges-artifact".into(),
                src: "/imagery/edges.png".into()
            })
        );
    }

    #[test]
    fn whole_number_stats_print_as_integers() {
        let stats = BTreeMap::from([
            ("count".to_string(), 2.0),
            ("mean".to_string(), 0.25),
            ("offset".to_string(), -3.0),
            ("spread".to_string(), f64::NAN),
        ]);
        assert_eq!(
            stats_json(&stats),
            r#"{"count":2,"mean":0.25,"offset":-3,"spread":null}"#
        );
        assert_eq!(stats_json(&BTreeMap::new()), "{}");

        let mut response = sample();
        response.analysis.ops[0].stats = BTreeMap::from([("count".to_string(), 2.0)]);
        assert_eq!(
            summarize(&response).mcp.items[0].text,
            r#"edges: found 2 rims | stats={"count":2}"#
        );
    }

    #[test]
    fn empty_response_uses_fallback_decisions() {
        let summary = summarize(&StructuredResponse::default());

        assert_eq!(summary.pipeline.details, vec!["".to_string(), "latency: 0 ms".to_string()]);
        assert_eq!(summary.rag.details[0], "decision: route.rag:false");
        assert_eq!(summary.rag.details[1], "hits: 0");
        assert_eq!(summary.mcp.details[0], "decision: route.mcp:false");
        assert_eq!(summary.mcp.details[1], "ops: (none)");
        assert!(summary.rag.items.is_empty());
        assert!(summary.mcp.items.is_empty());
        assert!(summary.mcp.error.is_none());
    }
}
