//! Map-dataset addresses read from a local OSM PBF extract.
//!
//! Ways and multipolygon relations carrying an address are resolved to the
//! centroid of their geometry. Node coordinates needed for that are kept in
//! an on-disk index while the file is scanned.
//!
//! When a commune TERC id is given, the extract may cover a larger area:
//! addresses are clipped to the `boundary=administrative` relation tagged
//! with that `teryt:terc`.

use geo::{Centroid, Contains, Coord, LineString, MultiPoint, MultiPolygon, Polygon};
use hashbrown::{HashMap, HashSet};
use indicatif::{ProgressBar, ProgressStyle};
use osmpbfreader::{NodeId, OsmId, OsmObj, OsmPbfReader, RelationId, WayId};
use sled::Db;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tempfile::{Builder, TempDir};
use tracing::info;

use super::overpass::address_from_tags;
use super::ParsedBatch;
use crate::error::{ReconcileError, Result, SkipReason};
use crate::models::{Address, OsmType, Point, Tags};

fn has_address(tags: &osmpbfreader::Tags) -> bool {
    tags.contains_key("addr:housenumber")
}

fn is_named_street(tags: &osmpbfreader::Tags) -> bool {
    tags.contains_key("highway") && tags.contains_key("name")
}

fn is_commune_boundary(tags: &osmpbfreader::Tags, teryt_terc: &str) -> bool {
    tags.get("boundary").map_or(false, |v| v == "administrative")
        && tags.get("teryt:terc").map_or(false, |v| v == teryt_terc)
}

fn to_tags(tags: &osmpbfreader::Tags) -> Tags {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn is_closed(ring: &[Coord<f64>]) -> bool {
    ring.len() >= 4 && ring.first() == ring.last()
}

/// Centroid of a set of member rings.
///
/// Closed rings are treated as areas. A single open way gives its line
/// centroid; several open ways fall back to the centroid of all their points.
pub fn centroid_of(rings: &[Vec<Coord<f64>>]) -> Option<Point> {
    let polygons: Vec<Polygon<f64>> = rings
        .iter()
        .filter(|ring| is_closed(ring))
        .map(|ring| Polygon::new(LineString::new(ring.clone()), vec![]))
        .collect();

    let centroid = if !polygons.is_empty() {
        MultiPolygon::new(polygons).centroid()
    } else if let [ring] = rings {
        LineString::new(ring.clone()).centroid()
    } else {
        MultiPoint::from(rings.concat()).centroid()
    }?;

    Some(Point::new(centroid.y(), centroid.x()))
}

/// Join boundary segments end to end into closed polygons
pub fn merge_rings_to_polygons(rings: Vec<Vec<Coord<f64>>>) -> Vec<Polygon<f64>> {
    let mut result = Vec::new();
    let mut remaining = rings;

    while !remaining.is_empty() {
        let mut current = remaining.remove(0);

        if is_closed(&current) {
            result.push(Polygon::new(LineString::new(current), vec![]));
            continue;
        }

        let mut merged = true;
        while merged && !remaining.is_empty() {
            merged = false;
            let start = current.first().copied();
            let end = current.last().copied();

            for i in 0..remaining.len() {
                let ring_start = remaining[i].first().copied();
                let ring_end = remaining[i].last().copied();

                if end == ring_start {
                    let mut ring = remaining.remove(i);
                    ring.remove(0);
                    current.extend(ring);
                } else if end == ring_end {
                    let mut ring = remaining.remove(i);
                    ring.reverse();
                    ring.remove(0);
                    current.extend(ring);
                } else if start == ring_end {
                    let mut ring = remaining.remove(i);
                    ring.pop();
                    ring.extend(current);
                    current = ring;
                } else if start == ring_start {
                    let mut ring = remaining.remove(i);
                    ring.reverse();
                    ring.pop();
                    ring.extend(current);
                    current = ring;
                } else {
                    continue;
                }
                merged = true;
                break;
            }
        }

        if current.len() >= 3 {
            if current.first() != current.last() {
                current.push(current[0]);
            }
            if current.len() >= 4 {
                result.push(Polygon::new(LineString::new(current), vec![]));
            }
        }
    }

    result
}

/// Keep addresses lying inside the commune boundary; returns the number dropped
pub fn clip_to_boundary(addresses: &mut Vec<Address>, boundary: &MultiPolygon<f64>) -> usize {
    let before = addresses.len();
    addresses.retain(|addr| boundary.contains(&geo::Point::new(addr.point.lon, addr.point.lat)));
    before - addresses.len()
}

/// Resolves centroids of address ways and relations, and the commune
/// boundary when one was requested
pub struct CentroidResolver {
    node_db: Db,
    way_nodes: HashMap<WayId, Vec<NodeId>>,
    relation_members: HashMap<RelationId, Vec<WayId>>,
    boundary_members: Vec<WayId>,
    // keeps the node index directory alive
    _temp_dir: TempDir,
}

impl CentroidResolver {
    /// Build the resolver by scanning the file
    pub fn build<R: Read + Seek>(
        reader: &mut OsmPbfReader<R>,
        teryt_terc: Option<&str>,
    ) -> Result<Self> {
        info!("Building geometry index...");

        let mut needed_ways = HashSet::new();
        let mut needed_nodes = HashSet::new();
        let mut relation_members = HashMap::new();
        let mut boundary_members = Vec::new();
        let mut way_nodes = HashMap::new();

        info!("Pass 1/3: Identifying address and boundary relations...");
        reader.rewind()?;
        for obj in reader.iter() {
            let OsmObj::Relation(rel) = obj? else {
                continue;
            };
            let is_boundary = teryt_terc.map_or(false, |terc| is_commune_boundary(&rel.tags, terc));
            if !is_boundary && !has_address(&rel.tags) {
                continue;
            }

            let ways: Vec<WayId> = rel
                .refs
                .iter()
                .filter(|m| m.role == "outer" || m.role.is_empty())
                .filter_map(|m| match m.member {
                    OsmId::Way(way_id) => Some(way_id),
                    _ => None,
                })
                .collect();
            needed_ways.extend(ways.iter().copied());

            if is_boundary {
                boundary_members.extend(ways.iter().copied());
            }
            if has_address(&rel.tags) {
                relation_members.insert(rel.id, ways);
            }
        }
        info!(
            "Found {} address relations, {} boundary ways",
            relation_members.len(),
            boundary_members.len()
        );

        info!("Pass 2/3: Identifying address ways...");
        reader.rewind()?;
        for obj in reader.iter() {
            if let OsmObj::Way(way) = obj? {
                if needed_ways.contains(&way.id) || has_address(&way.tags) {
                    needed_nodes.extend(way.nodes.iter().copied());
                    way_nodes.insert(way.id, way.nodes);
                }
            }
        }
        info!(
            "Found {} relevant ways, referencing {} nodes",
            way_nodes.len(),
            needed_nodes.len()
        );

        info!("Pass 3/3: Storing node coordinates...");
        reader.rewind()?;

        let temp_dir = Builder::new().prefix("addr-reconcile-geo-").tempdir()?;
        let db = sled::open(temp_dir.path())?;

        let mut stored_count = 0;
        for obj in reader.iter() {
            if let OsmObj::Node(node) = obj? {
                if needed_nodes.contains(&node.id) {
                    let mut value = [0u8; 16];
                    value[0..8].copy_from_slice(&node.lon().to_be_bytes());
                    value[8..16].copy_from_slice(&node.lat().to_be_bytes());
                    db.insert(node.id.0.to_be_bytes(), &value)?;
                    stored_count += 1;
                }
            }
        }

        db.flush()?;
        info!("Stored {} node coordinates", stored_count);

        Ok(Self {
            node_db: db,
            way_nodes,
            relation_members,
            boundary_members,
            _temp_dir: temp_dir,
        })
    }

    fn node_coord(&self, node_id: NodeId) -> Option<Coord<f64>> {
        let bytes = self.node_db.get(node_id.0.to_be_bytes()).ok()??;
        if bytes.len() != 16 {
            return None;
        }

        let lon = f64::from_be_bytes(bytes[0..8].try_into().ok()?);
        let lat = f64::from_be_bytes(bytes[8..16].try_into().ok()?);
        Some(Coord { x: lon, y: lat })
    }

    fn way_coords(&self, way_id: WayId) -> Vec<Coord<f64>> {
        self.way_nodes
            .get(&way_id)
            .map(|nodes| nodes.iter().filter_map(|n| self.node_coord(*n)).collect())
            .unwrap_or_default()
    }

    fn member_rings(&self, members: &[WayId]) -> Vec<Vec<Coord<f64>>> {
        members
            .iter()
            .map(|way_id| self.way_coords(*way_id))
            .filter(|coords| !coords.is_empty())
            .collect()
    }

    pub fn way_centroid(&self, way_id: WayId) -> Option<Point> {
        centroid_of(&[self.way_coords(way_id)])
    }

    pub fn relation_centroid(&self, relation_id: RelationId) -> Option<Point> {
        let members = self.relation_members.get(&relation_id)?;
        centroid_of(&self.member_rings(members))
    }

    /// Commune boundary assembled from its outer ways
    pub fn commune_boundary(&self) -> Option<MultiPolygon<f64>> {
        let rings: Vec<_> = self
            .member_rings(&self.boundary_members)
            .into_iter()
            .filter(|ring| ring.len() >= 2)
            .collect();
        let polygons = merge_rings_to_polygons(rings);
        (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
    }
}

/// Addresses and named streets read from a PBF extract
pub struct PbfDataset {
    pub addresses: ParsedBatch<Address>,
    pub streets: Vec<Tags>,
}

/// Read addresses from a PBF file, clipped to the commune when `teryt_terc` is set
pub fn read_pbf_file(path: &Path, teryt_terc: Option<&str>) -> Result<PbfDataset> {
    info!("Reading OSM PBF file: {}", path.display());
    let file = File::open(path)?;
    let mut reader = OsmPbfReader::new(BufReader::new(file));
    read_pbf(&mut reader, teryt_terc)
}

pub fn read_pbf<R: Read + Seek>(
    reader: &mut OsmPbfReader<R>,
    teryt_terc: Option<&str>,
) -> Result<PbfDataset> {
    let resolver = CentroidResolver::build(reader, teryt_terc)?;

    let boundary = match teryt_terc {
        Some(terc) => Some(
            resolver
                .commune_boundary()
                .ok_or_else(|| ReconcileError::BoundaryNotFound(terc.to_string()))?,
        ),
        None => None,
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} objects ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let mut addresses = ParsedBatch::new();
    let mut streets = Vec::new();

    reader.rewind()?;
    for obj in reader.iter() {
        pb.inc(1);
        let obj = obj?;

        if let OsmObj::Way(way) = &obj {
            if is_named_street(&way.tags) {
                streets.push(to_tags(&way.tags));
            }
        }

        if !has_address(obj.tags()) {
            continue;
        }

        let (osm_type, osm_id, point) = match &obj {
            OsmObj::Node(node) => (
                OsmType::Node,
                node.id.0,
                Some(Point::new(node.lat(), node.lon())),
            ),
            OsmObj::Way(way) => (OsmType::Way, way.id.0, resolver.way_centroid(way.id)),
            OsmObj::Relation(rel) => (
                OsmType::Relation,
                rel.id.0,
                resolver.relation_centroid(rel.id),
            ),
        };

        let parsed = point
            .ok_or(SkipReason::NoGeometry)
            .and_then(|point| address_from_tags(osm_type, osm_id, &to_tags(obj.tags()), point));
        addresses.push(parsed, &format_args!("{} {}", osm_type, osm_id));
    }

    pb.finish_with_message("Processing complete");

    if let Some(boundary) = &boundary {
        let outside = clip_to_boundary(&mut addresses.records, boundary);
        info!("Dropped {} OSM addresses outside the commune boundary", outside);
    }

    info!(
        "Read {} OSM addresses ({} skipped) and {} named streets",
        addresses.records.len(),
        addresses.skipped,
        streets.len()
    );

    Ok(PbfDataset { addresses, streets })
}
