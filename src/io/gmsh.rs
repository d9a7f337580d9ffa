//! Gmsh `.msh` reader.
//!
//! # Supported format
//! - ASCII `.msh` version **2.2**.
//! - All 19 fixed-size element types of the format (codes 1..=19), see
//!   [`ElementType`].
//!
//! # Limitations
//! - Binary files are not supported.
//! - `.msh` v4.x (block-based) is not supported.
//! - Element tags are skipped (no physical groups or boundary markers).
//!
//! Node ids are arbitrary positive integers in the file; they are mapped to
//! zero-based positions in the order the nodes are listed.

use std::io::Read;
use std::path::Path;

use hashbrown::HashMap;

use crate::io::MeshReader;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::ElementType;
use crate::topology::mesh::{Element, Mesh, Node};

/// Contents of the `$MeshFormat` section.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshFormat {
    pub version: String,
    pub file_type: u32,
    pub data_size: usize,
}

/// Gmsh `.msh` reader for ASCII v2.2 meshes.
#[derive(Debug, Default, Clone)]
pub struct GmshReader;

fn parse_err(msg: impl Into<String>) -> MeshError {
    MeshError::MeshIoParse(msg.into())
}

fn next_line<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<&'a str, MeshError> {
    lines
        .next()
        .ok_or_else(|| parse_err(format!("unexpected end of file, expected {what}")))
}

fn expect_end<'a>(lines: &mut impl Iterator<Item = &'a str>, tag: &str) -> Result<(), MeshError> {
    let line = next_line(lines, tag)?;
    if line.trim() != tag {
        return Err(parse_err(format!("expected {tag}, found {:?}", line.trim())));
    }
    Ok(())
}

fn parse<T: std::str::FromStr>(raw: Option<&str>, what: &str) -> Result<T, MeshError> {
    let raw = raw.ok_or_else(|| parse_err(format!("missing {what}")))?;
    raw.parse::<T>()
        .map_err(|_| parse_err(format!("invalid {what}: {raw}")))
}

impl GmshReader {
    fn parse_format(line: &str) -> Result<MeshFormat, MeshError> {
        let mut parts = line.split_whitespace();
        let version: String = parse(parts.next(), "mesh format version")?;
        let file_type: u32 = parse(parts.next(), "mesh format type")?;
        let data_size: usize = parse(parts.next(), "mesh format data size")?;
        if file_type != 0 {
            return Err(parse_err("binary .msh files are not supported"));
        }
        if !version.starts_with("2.2") {
            return Err(parse_err(format!("unsupported gmsh version: {version}")));
        }
        Ok(MeshFormat {
            version,
            file_type,
            data_size,
        })
    }

    /// Decode a whole `.msh` document.
    pub fn decode(&self, contents: &str) -> Result<Mesh<f64>, MeshError> {
        let mut lines = contents.lines();

        let mut format: Option<MeshFormat> = None;
        let mut ids: HashMap<u64, usize> = HashMap::new();
        let mut nodes: Vec<Node<f64>> = Vec::new();
        let mut raw_elements: Vec<(ElementType, Vec<u64>)> = Vec::new();

        while let Some(line) = lines.next() {
            match line.trim() {
                "$MeshFormat" => {
                    format = Some(Self::parse_format(next_line(&mut lines, "mesh format")?)?);
                    expect_end(&mut lines, "$EndMeshFormat")?;
                }
                "$Nodes" => {
                    let count: usize =
                        parse(Some(next_line(&mut lines, "node count")?.trim()), "node count")?;
                    nodes.reserve(count);
                    ids.reserve(count);
                    for _ in 0..count {
                        let mut parts = next_line(&mut lines, "node")?.split_whitespace();
                        let id: u64 = parse(parts.next(), "node id")?;
                        let x = parse(parts.next(), "x coordinate")?;
                        let y = parse(parts.next(), "y coordinate")?;
                        let z = parse(parts.next(), "z coordinate")?;
                        if ids.insert(id, nodes.len()).is_some() {
                            return Err(parse_err(format!("duplicate node id {id}")));
                        }
                        nodes.push(Node::new(x, y, z));
                    }
                    expect_end(&mut lines, "$EndNodes")?;
                }
                "$Elements" => {
                    let count: usize = parse(
                        Some(next_line(&mut lines, "element count")?.trim()),
                        "element count",
                    )?;
                    raw_elements.reserve(count);
                    for _ in 0..count {
                        let mut parts = next_line(&mut lines, "element")?.split_whitespace();
                        let _id: u64 = parse(parts.next(), "element id")?;
                        let code: u32 = parse(parts.next(), "element type")?;
                        let kind = ElementType::from_gmsh(code)
                            .ok_or_else(|| parse_err(format!("unsupported element type: {code}")))?;
                        let tags: usize = parse(parts.next(), "element tag count")?;
                        for _ in 0..tags {
                            parts.next();
                        }
                        let conn = (0..kind.node_count())
                            .map(|_| parse::<u64>(parts.next(), "element node id"))
                            .collect::<Result<Vec<_>, _>>()?;
                        raw_elements.push((kind, conn));
                    }
                    expect_end(&mut lines, "$EndElements")?;
                }
                _ => {
                    // ignore other sections
                }
            }
        }

        if format.is_none() {
            log::warn!("gmsh input has no $MeshFormat section; assuming 2.2 ASCII");
        }

        let elements = raw_elements
            .into_iter()
            .map(|(kind, conn)| {
                let nodes = conn
                    .into_iter()
                    .map(|id| {
                        ids.get(&id)
                            .copied()
                            .ok_or_else(|| parse_err(format!("element references unknown node {id}")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Element::new(kind, nodes))
            })
            .collect::<Result<Vec<_>, MeshError>>()?;

        log::debug!(
            "decoded gmsh mesh: {} nodes, {} elements",
            nodes.len(),
            elements.len()
        );
        Mesh::new(nodes, elements)
    }
}

impl MeshReader for GmshReader {
    fn read<R: Read>(&self, mut reader: R) -> Result<Mesh<f64>, MeshError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        self.decode(&contents)
    }
}

/// Decode an ASCII v2.2 `.msh` document.
pub fn decode(contents: &str) -> Result<Mesh<f64>, MeshError> {
    GmshReader.decode(contents)
}

/// Read and decode a `.msh` file.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Mesh<f64>, MeshError> {
    decode(&std::fs::read_to_string(path)?)
}
