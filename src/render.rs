// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Standalone HTML viewer page
//!
//! Drawing is delegated to the bpmn-js viewer. The page receives the XML
//! unmodified as a JSON string literal, plus the resolved KPI links so
//! matched elements can be marked and badged.

use crate::diagram::{resolve_links, DiagramDocument, DiagramElement, KpiLink};
use crate::error::DashboardError;
use crate::kpi::KpiTable;
use serde::Serialize;

/// Viewer bundle loaded by the page
pub const BPMN_JS_URL: &str = "https://unpkg.com/bpmn-js@10.2.1/dist/bpmn-viewer.production.min.js";

#[derive(Debug, Serialize)]
struct LinkBadge<'a> {
    id: &'a str,
    key: &'a str,
    target: &'a str,
    owner: &'a str,
}

/// Render the viewer page for one diagram.
///
/// `elements` may be empty (e.g. the scan failed); the diagram is still
/// handed to the viewer, which reports its own import errors.
pub fn viewer_html(
    title: &str,
    document: &DiagramDocument,
    elements: &[DiagramElement],
    table: Option<&KpiTable>,
) -> Result<String, DashboardError> {
    let badges: Vec<LinkBadge<'_>> = resolve_links(elements, table)
        .into_iter()
        .filter_map(|l| match l.link {
            KpiLink::Matched(record) => Some(LinkBadge {
                id: &l.element.id,
                key: &record.key,
                target: record.target().unwrap_or_default(),
                owner: record.owner().unwrap_or_default(),
            }),
            _ => None,
        })
        .collect();

    let xml_literal = script_literal(document.xml())?;
    let links_literal = script_literal(&badges)?;

    let mut html = String::with_capacity(document.xml().len() + 4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(title)));
    html.push_str("<div id=\"canvas\"></div>\n");
    html.push_str(&kpi_table_html(table));
    html.push_str(&format!("<script src=\"{BPMN_JS_URL}\"></script>\n"));
    html.push_str("<script>\n");
    html.push_str(&format!("  const xml = {xml_literal};\n"));
    html.push_str(&format!("  const links = {links_literal};\n"));
    html.push_str(SCRIPT);
    html.push_str("</script>\n</body>\n</html>\n");

    Ok(html)
}

const STYLE: &str = r#"<style>
  body { font-family: sans-serif; margin: 1rem; }
  #canvas { height: 60vh; border: 1px solid #ddd; border-radius: 8px; margin-bottom: 0.5rem; }
  .kpi-linked:not(.djs-connection) .djs-visual > :nth-child(1) { fill: #c8e6c9 !important; }
  .kpi-badge { background: #2e7d32; color: #fff; border-radius: 4px; padding: 1px 4px; font-size: 11px; white-space: nowrap; }
  table { border-collapse: collapse; }
  th, td { border: 1px solid #ddd; padding: 2px 8px; text-align: left; }
  pre.error { color: #b71c1c; }
</style>
"#;

const SCRIPT: &str = r"  const viewer = new BpmnJS({ container: '#canvas' });
  viewer.importXML(xml).then(() => {
    const canvas = viewer.get('canvas');
    const overlays = viewer.get('overlays');
    canvas.zoom('fit-viewport');
    for (const link of links) {
      try {
        canvas.addMarker(link.id, 'kpi-linked');
        const badge = document.createElement('div');
        badge.className = 'kpi-badge';
        badge.title = link.key + (link.owner ? ' (' + link.owner + ')' : '');
        badge.textContent = link.target || link.key;
        overlays.add(link.id, { position: { bottom: 0, right: 0 }, html: badge });
      } catch (e) { /* element not drawn */ }
    }
  }).catch((err) => {
    const pre = document.createElement('pre');
    pre.className = 'error';
    pre.textContent = (err && err.message) ? err.message : err;
    document.body.appendChild(pre);
  });
";

fn kpi_table_html(table: Option<&KpiTable>) -> String {
    let Some(table) = table else {
        return "<p>No KPI table loaded.</p>\n".to_string();
    };

    let mut out = String::from("<h2>KPIs</h2>\n<table>\n<tr>");
    for column in table.columns() {
        out.push_str(&format!("<th>{}</th>", escape_html(column)));
    }
    out.push_str("</tr>\n");
    for record in table.records() {
        out.push_str("<tr>");
        for cell in table.row(record) {
            out.push_str(&format!("<td>{}</td>", escape_html(&cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    out
}

/// JSON literal safe to embed inside a `<script>` element
fn script_literal<T: Serialize + ?Sized>(value: &T) -> Result<String, DashboardError> {
    let json = serde_json::to_string(value)
        .map_err(|e| DashboardError::Parse(format!("viewer payload: {e}")))?;
    Ok(json.replace("</", "<\\/"))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::scan_elements;
    use crate::diagram::tests::HR_DIAGRAM;

    #[test]
    fn test_viewer_embeds_xml_unmodified() {
        let doc = DiagramDocument::from_xml(HR_DIAGRAM.to_string());
        let elements = scan_elements(HR_DIAGRAM).unwrap();
        let html = viewer_html("HR <Recruitment>", &doc, &elements, None).unwrap();

        assert!(html.contains(BPMN_JS_URL));
        assert!(html.contains("<title>HR &lt;Recruitment&gt;</title>"));
        assert!(html.contains("No KPI table loaded."));
        assert!(html.contains("const links = [];"));

        // The literal decodes back to the exact document
        let start = html.find("const xml = ").unwrap() + "const xml = ".len();
        let end = start + html[start..].find(";\n").unwrap();
        let literal = html[start..end].replace("<\\/", "</");
        let decoded: String = serde_json::from_str(&literal).unwrap();
        assert_eq!(decoded, HR_DIAGRAM);
    }

    #[test]
    fn test_viewer_lists_matched_links() {
        let doc = DiagramDocument::from_xml(HR_DIAGRAM.to_string());
        let elements = scan_elements(HR_DIAGRAM).unwrap();
        let table = KpiTable::parse(b"kpi_key,target,owner\ntime_to_screen,48h,HR Recruiting\n").unwrap();
        let html = viewer_html("HR", &doc, &elements, Some(&table)).unwrap();

        assert!(html.contains(r#"{"id":"Screen","key":"time_to_screen","target":"48h","owner":"HR Recruiting"}"#));
        assert!(!html.contains(r#""id":"Offer""#));
        assert!(html.contains("<td>time_to_screen</td><td>48h</td><td>HR Recruiting</td>"));
    }

    #[test]
    fn test_script_literal_cannot_close_script() {
        let literal = script_literal("</script><script>alert(1)</script>").unwrap();
        assert!(!literal.contains("</script>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a & "b" <c>"#), "a &amp; &quot;b&quot; &lt;c&gt;");
    }
}
