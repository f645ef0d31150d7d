use std::fs;
use std::path::Path;

use crate::domain::network::link::Link;
use crate::domain::network::node::{Node, NodeKind, PlayerProfile};
use crate::domain::network::topology::TopologyGraph;
use crate::domain::utils::id::NodeId;
use crate::error::{Error, Result};

/// Loads the node and link files into a built `TopologyGraph`.
pub fn read_topology(nodes_file: impl AsRef<Path>, links_file: impl AsRef<Path>, per_stream_unit: f64) -> Result<TopologyGraph> {
    let (nodes_file, links_file) = (nodes_file.as_ref(), links_file.as_ref());

    let nodes = parse_nodes(&fs::read_to_string(nodes_file)?, &nodes_file.display().to_string())?;
    let links = parse_links(&fs::read_to_string(links_file)?, &links_file.display().to_string())?;

    let mut graph = TopologyGraph::new(per_stream_unit);
    let node_count = nodes.len();
    for node in nodes {
        graph.add_node_entry(node);
    }
    for link in links {
        graph.add_link(link.src, link.dst, link.rate, link.delay, link.loss, link.buffer_size);
    }
    graph.build_adjacency(node_count)?;

    log::info!("Topology loaded: {} nodes, {} links.", graph.size(), graph.links().len());
    Ok(graph)
}

/// Rows worth parsing: not blank, not a `#` comment, and not a header
/// (a first row whose leading token is not an integer).
fn data_rows(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    let mut first = true;
    text.lines().enumerate().filter_map(move |(index, line)| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() || fields[0].starts_with('#') {
            return None;
        }
        let header = first && fields[0].parse::<usize>().is_err();
        first = false;
        if header { None } else { Some((index + 1, fields)) }
    })
}

fn parse_error(file: &str, line: usize, reason: impl Into<String>) -> Error {
    Error::TopologyParseError { file: file.to_string(), line, reason: reason.into() }
}

fn field<T: std::str::FromStr>(fields: &[&str], position: usize, name: &str, file: &str, line: usize) -> Result<T> {
    let raw = fields.get(position).ok_or_else(|| parse_error(file, line, format!("missing field '{}'", name)))?;
    raw.parse::<T>().map_err(|_| parse_error(file, line, format!("invalid {} '{}'", name, raw)))
}

fn seconds(fields: &[&str], position: usize, name: &str, file: &str, line: usize) -> Result<f64> {
    let raw = fields.get(position).ok_or_else(|| parse_error(file, line, format!("missing field '{}'", name)))?;
    raw.trim_end_matches('s').parse::<f64>().map_err(|_| parse_error(file, line, format!("invalid {} '{}'", name, raw)))
}

/// `id type [adaptation-logic start-up-delay allow-downscale allow-upscale max-buffered-seconds]`
pub fn parse_nodes(text: &str, file: &str) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();

    for (line, fields) in data_rows(text) {
        let id: usize = field(&fields, 0, "node id", file, line)?;
        let kind: NodeKind = fields
            .get(1)
            .ok_or_else(|| parse_error(file, line, "missing node type"))?
            .parse()
            .map_err(|e: Error| parse_error(file, line, e.to_string()))?;

        let mut node = Node::new(NodeId::new(id), kind);
        if kind == NodeKind::Client && fields.len() > 2 {
            if fields.len() < 7 {
                return Err(parse_error(file, line, format!("client row needs 7 fields, found {}", fields.len())));
            }
            node = node.with_player(PlayerProfile {
                adaptation_logic: fields[2].to_string(),
                start_up_delay_s: seconds(&fields, 3, "start-up delay", file, line)?,
                allow_downscale: fields[4].eq_ignore_ascii_case("yes"),
                allow_upscale: fields[5].eq_ignore_ascii_case("yes"),
                max_buffered_seconds: seconds(&fields, 6, "max buffered seconds", file, line)?,
            });
        }
        nodes.push(node);
    }

    let mut ids: Vec<usize> = nodes.iter().map(|node| node.id.index()).collect();
    ids.sort_unstable();
    if let Some(position) = ids.iter().enumerate().position(|(expected, id)| *id != expected) {
        return Err(Error::InvalidTopology(format!("node ids in '{}' must be dense from 0, id {} is missing or duplicated", file, position)));
    }

    Ok(nodes)
}

/// `src dst rate delay loss bufferSize`
pub fn parse_links(text: &str, file: &str) -> Result<Vec<Link>> {
    let mut links = Vec::new();

    for (line, fields) in data_rows(text) {
        if fields.len() < 6 {
            return Err(parse_error(file, line, format!("link row needs 6 fields, found {}", fields.len())));
        }

        let src: usize = field(&fields, 0, "source", file, line)?;
        let dst: usize = field(&fields, 1, "destination", file, line)?;
        let rate: f64 = field(&fields, 2, "rate", file, line)?;
        let delay: f64 = field(&fields, 3, "delay", file, line)?;
        let loss: f64 = field(&fields, 4, "loss", file, line)?;
        let buffer_size: f64 = field(&fields, 5, "buffer size", file, line)?;

        if rate <= 0.0 {
            return Err(parse_error(file, line, format!("rate must be positive, got {}", rate)));
        }
        if !(0.0..=1.0).contains(&loss) {
            return Err(parse_error(file, line, format!("loss must be within [0, 1], got {}", loss)));
        }

        links.push(Link::new(NodeId::new(src), NodeId::new(dst), rate, delay, loss, buffer_size.max(0.0) as u32));
    }

    Ok(links)
}
