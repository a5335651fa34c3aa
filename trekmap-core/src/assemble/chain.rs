//! Ring chaining: joins open member ways that share endpoints.
//!
//! Ways are edges of an undirected multigraph whose vertices are way
//! endpoints. Chaining walks that graph with an adjacency map and an explicit
//! visited set, always taking the lowest-numbered unused way so the result is
//! deterministic.
#![expect(
    clippy::float_arithmetic,
    reason = "snap closing compares endpoint distances"
)]

use std::collections::HashMap;
use std::time::Instant;

use geo::Coord;

use crate::element::{Member, Role, is_closed};

/// A chained ring candidate.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ChainedRing {
    pub(super) coords: Vec<Coord<f64>>,
    pub(super) role: Option<Role>,
    /// First member way that contributed to the ring, for log messages.
    pub(super) first_way: i64,
}

impl ChainedRing {
    pub(super) fn is_closed(&self) -> bool {
        is_closed(&self.coords)
    }
}

/// Chaining ran past its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DeadlineExceeded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EndpointKey(u64, u64);

impl From<Coord<f64>> for EndpointKey {
    fn from(coord: Coord<f64>) -> Self {
        // `0.0 + -0.0 == 0.0`, so both zeroes share one key.
        Self((coord.x + 0.0).to_bits(), (coord.y + 0.0).to_bits())
    }
}

/// Chain member ways into ring candidates, tagging each ring with `role`.
pub(super) fn chain_rings(
    members: &[&Member],
    role: Option<Role>,
    snap_tolerance: f64,
    deadline: Option<Instant>,
) -> Result<Vec<ChainedRing>, DeadlineExceeded> {
    let mut rings = Vec::new();
    let mut open: Vec<&Member> = Vec::new();
    for member in members {
        if member.coords.len() < 2 {
            continue;
        }
        if is_closed(&member.coords) {
            rings.push(ChainedRing {
                coords: member.coords.clone(),
                role,
                first_way: member.way_id,
            });
        } else {
            open.push(member);
        }
    }

    let mut endpoints: HashMap<EndpointKey, Vec<usize>> = HashMap::new();
    for (index, member) in open.iter().enumerate() {
        for coord in [member.coords.first(), member.coords.last()]
            .into_iter()
            .flatten()
        {
            endpoints.entry(EndpointKey::from(*coord)).or_default().push(index);
        }
    }

    let mut used = vec![false; open.len()];
    for (start, member) in open.iter().enumerate() {
        if !claim(&mut used, start) {
            continue;
        }
        let mut coords = member.coords.clone();
        while !is_closed(&coords) {
            if deadline.is_some_and(|limit| Instant::now() >= limit) {
                return Err(DeadlineExceeded);
            }
            let Some(tail) = coords.last().copied() else {
                break;
            };
            let Some(next) = endpoints
                .get(&EndpointKey::from(tail))
                .and_then(|candidates| {
                    candidates
                        .iter()
                        .copied()
                        .find(|index| used.get(*index).is_some_and(|taken| !taken))
                })
            else {
                break;
            };
            claim(&mut used, next);
            if let Some(segment) = open.get(next) {
                extend_from(&mut coords, &segment.coords, tail);
            }
        }
        if !is_closed(&coords) && snap_tolerance > 0.0 {
            snap_close(&mut coords, snap_tolerance);
        }
        rings.push(ChainedRing {
            coords,
            role,
            first_way: member.way_id,
        });
    }
    Ok(rings)
}

/// Mark way `index` as used, returning whether it was still free.
fn claim(used: &mut [bool], index: usize) -> bool {
    used.get_mut(index)
        .is_some_and(|taken| !std::mem::replace(taken, true))
}

/// Append `segment` to `coords`, reversing it when it ends at `joint`.
fn extend_from(coords: &mut Vec<Coord<f64>>, segment: &[Coord<f64>], joint: Coord<f64>) {
    let joint_key = EndpointKey::from(joint);
    let starts_at_joint = segment
        .first()
        .is_some_and(|first| EndpointKey::from(*first) == joint_key);
    if starts_at_joint {
        coords.extend(segment.iter().skip(1).copied());
    } else {
        coords.extend(segment.iter().rev().skip(1).copied());
    }
}

fn snap_close(coords: &mut Vec<Coord<f64>>, tolerance: f64) {
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        let gap = (first.x - last.x).hypot(first.y - last.y);
        if gap <= tolerance {
            coords.push(first);
        }
    }
}
