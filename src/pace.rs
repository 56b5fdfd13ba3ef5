//! PACE `.gr` textual instance reader and solution writer. A thin
//! collaborator that converts between the wire format and a [`Graph`],
//! never touched by the algorithmic modules themselves.
//!
//! Grounded in `original_source/src/read.hpp` (`graph_from_file`,
//! `read_edges`, `read_terminals`) and the edge-printing tail of
//! `write.hpp`'s `print_solution`. The original's line-oriented `fgets`
//! parsing (matching `PACE_SECTION_END`/`PACE_TERMINALS_START` literal
//! strings) is re-expressed as a first-token dispatch per line, which is
//! equivalent but naturally tolerant of unrecognized lines appearing
//! between sections, without needing an explicit section-tracking state
//! machine.

use std::collections::BTreeSet;
use std::io::BufRead;
use std::str::SplitWhitespace;

use crate::error::ReadError;
use crate::graph::{Graph, Vertex, Weight};

fn parse_tok<T: std::str::FromStr>(tok: &mut SplitWhitespace, section: &'static str, what: &'static str) -> Result<T, ReadError> {
    tok.next()
        .ok_or_else(|| ReadError::MalformedSection { section, detail: format!("missing {}", what) })?
        .parse()
        .map_err(|_| ReadError::MalformedSection { section, detail: format!("{} is not an integer", what) })
}

/// Parses a PACE `.gr` instance, converting 1-based input vertex/terminal
/// ids to 0-based internally. Tolerant of blank lines and any line whose
/// first token isn't one this format recognizes (`SECTION`, `END`, `EOF`
/// included) - those are structurally ignored.
pub fn read_pace(reader: impl BufRead) -> Result<Graph, ReadError> {
    let mut vertex_count: Option<usize> = None;
    let mut graph: Option<Graph> = None;
    let mut terminals_declared: Option<usize> = None;
    let mut terminals_seen = 0usize;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut tok = line.split_whitespace();
        let head = tok.next().unwrap_or("");
        match head {
            "Nodes" => {
                let n: usize = parse_tok(&mut tok, "Graph", "Nodes count")?;
                vertex_count = Some(n);
                graph = Some(Graph::new(n));
            }
            "Edges" => {
                // M is implied by however many `E` lines actually follow;
                // nothing to pre-size here.
            }
            "E" => {
                let g = graph
                    .as_mut()
                    .ok_or_else(|| ReadError::MalformedSection { section: "Graph", detail: "edge line before Nodes".into() })?;
                let u: u32 = parse_tok(&mut tok, "Graph", "edge source")?;
                let v: u32 = parse_tok(&mut tok, "Graph", "edge target")?;
                let w: Weight = parse_tok(&mut tok, "Graph", "edge weight")?;
                let n = vertex_count.unwrap_or(0);
                if u == 0 || v == 0 || u as usize > n || v as usize > n {
                    return Err(ReadError::MalformedSection { section: "Graph", detail: format!("edge endpoint out of range: {} {}", u, v) });
                }
                if u == v {
                    continue; // no self-loops; silently dropped
                }
                g.add_original_edge((u - 1) as Vertex, (v - 1) as Vertex, w, u, v);
            }
            "Terminals" => {
                let k: usize = parse_tok(&mut tok, "Terminals", "Terminals count")?;
                terminals_declared = Some(k);
            }
            "T" => {
                let g = graph
                    .as_mut()
                    .ok_or_else(|| ReadError::MalformedSection { section: "Terminals", detail: "terminal line before Nodes".into() })?;
                let t: u32 = parse_tok(&mut tok, "Terminals", "terminal id")?;
                if t == 0 || t as usize > g.vertex_count() {
                    return Err(ReadError::MalformedSection { section: "Terminals", detail: format!("terminal id out of range: {}", t) });
                }
                g.mark_terminal((t - 1) as Vertex);
                terminals_seen += 1;
            }
            _ => {} // SECTION headers, END, EOF, comments: ignored between sections
        }
    }

    let graph = graph.ok_or(ReadError::UnexpectedEof { expected: "SECTION Graph" })?;
    if let Some(declared) = terminals_declared {
        if declared != terminals_seen {
            return Err(ReadError::MalformedSection {
                section: "Terminals",
                detail: format!("declared {} terminals but read {}", declared, terminals_seen),
            });
        }
    } else {
        return Err(ReadError::UnexpectedEof { expected: "SECTION Terminals" });
    }

    Ok(graph)
}

/// Writes `VALUE weight` followed by one `u v` line per original edge
/// (1-based). Edge order is unspecified; `edges` is already deduplicated
/// via `BTreeSet`.
pub fn write_solution(writer: &mut impl std::io::Write, weight: Weight, edges: &BTreeSet<(u32, u32)>) -> std::io::Result<()> {
    writeln!(writer, "VALUE {}", weight)?;
    for &(u, v) in edges {
        writeln!(writer, "{} {}", u, v)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    const TRIANGLE: &str = "\
SECTION Graph
Nodes 3
Edges 3
E 1 2 3
E 2 3 2
E 3 1 70
END

SECTION Terminals
Terminals 3
T 1
T 2
T 3
END

EOF
";

    #[test]
    fn reads_triangle_instance() {
        let g = read_pace(TRIANGLE.as_bytes()).unwrap();
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.terminal_count(), 3);
        assert!(g.find_edge(0, 1).is_some());
    }

    #[test]
    fn rejects_edge_before_nodes_declared() {
        let bad = "SECTION Graph\nE 1 2 1\nEdges 1\nNodes 2\nEND\n";
        assert!(read_pace(bad.as_bytes()).is_err());
    }

    #[test]
    fn rejects_terminal_count_mismatch() {
        let bad = "\
SECTION Graph
Nodes 2
Edges 1
E 1 2 1
END

SECTION Terminals
Terminals 2
T 1
END
EOF
";
        assert!(read_pace(bad.as_bytes()).is_err());
    }

    #[test]
    fn write_solution_formats_value_and_edges() {
        let mut out = Vec::new();
        let mut edges = BTreeSet::new();
        edges.insert((1u32, 2u32));
        edges.insert((2u32, 3u32));
        write_solution(&mut out, 5, &edges).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "VALUE 5\n1 2\n2 3\n");
    }
}
