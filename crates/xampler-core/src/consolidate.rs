//! Flattening of the region tree into leaf regions.

use crate::descriptor::RegionNode;
use crate::opcodes::{merge, Opcodes};
use crate::types::{AssetRequest, Region};
use std::collections::BTreeSet;

/// Flatten a region tree into leaf regions, in document order.
///
/// Each group's opcodes are merged into its children before descending, so
/// every emitted region carries the opcodes of its whole ancestor path.
/// Missing nodes, and leaves that end up with no opcodes at all, are
/// skipped.
pub fn consolidate(nodes: &[Option<RegionNode>]) -> Vec<Region> {
    let mut regions = Vec::new();
    collect(nodes, &Opcodes::default(), &mut regions);
    regions.into_iter().map(Region::from_opcodes).collect()
}

fn collect(nodes: &[Option<RegionNode>], inherited: &Opcodes, out: &mut Vec<Opcodes>) {
    for node in nodes.iter().flatten() {
        let merged = merge(inherited, &node.opcodes);
        match &node.regions {
            Some(children) => collect(children, &merged, out),
            None if merged.is_empty() => continue,
            None => out.push(merged),
        }
    }
}

/// Distinct sample references across all regions, sorted.
pub fn list_assets(regions: &[Region]) -> BTreeSet<String> {
    regions
        .iter()
        .filter_map(|region| region.sample.clone())
        .collect()
}

/// Preload requests for every distinct sample, resolved against `base_url`.
pub fn asset_requests(regions: &[Region], base_url: &str) -> Vec<AssetRequest> {
    list_assets(regions)
        .into_iter()
        .map(|sample| AssetRequest {
            path: format!("{}{}", base_url, sample),
            sample,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(sample: &str, volume: Option<f64>) -> RegionNode {
        RegionNode::leaf(Opcodes {
            sample: Some(sample.to_string()),
            volume,
            ..Default::default()
        })
    }

    #[test]
    fn test_flat_tree_is_unchanged() {
        let nodes = vec![
            Some(leaf("a.wav", Some(-3.0))),
            Some(leaf("b.wav", None)),
        ];
        let regions = consolidate(&nodes);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].opcodes, nodes[0].as_ref().unwrap().opcodes);
        assert_eq!(regions[1].opcodes, nodes[1].as_ref().unwrap().opcodes);
    }

    #[test]
    fn test_volume_accumulates_along_path() {
        let tree = vec![Some(RegionNode::group(
            Opcodes {
                volume: Some(-2.0),
                pan: Some(10.0),
                ..Default::default()
            },
            vec![RegionNode::group(
                Opcodes {
                    volume: Some(-3.0),
                    ..Default::default()
                },
                vec![leaf("a.wav", Some(-1.0)), leaf("b.wav", None)],
            )],
        ))];

        let regions = consolidate(&tree);
        assert_eq!(regions.len(), 2);
        assert!((regions[0].volume - -6.0).abs() < 1e-9);
        assert!((regions[1].volume - -5.0).abs() < 1e-9);
        assert_eq!(regions[0].pan, Some(10.0));
    }

    #[test]
    fn test_document_order_is_stable() {
        let tree = vec![
            Some(RegionNode::group(
                Opcodes::default(),
                vec![leaf("1.wav", None), leaf("2.wav", None)],
            )),
            Some(leaf("3.wav", None)),
            Some(RegionNode::group(Opcodes::default(), vec![leaf("4.wav", None)])),
        ];
        let samples = |regions: Vec<Region>| -> Vec<String> {
            regions.into_iter().filter_map(|r| r.sample).collect()
        };
        let first = samples(consolidate(&tree));
        assert_eq!(first, vec!["1.wav", "2.wav", "3.wav", "4.wav"]);
        assert_eq!(samples(consolidate(&tree)), first);
    }

    #[test]
    fn test_skips_missing_and_empty_nodes() {
        let tree = vec![
            None,
            Some(RegionNode::default()),
            Some(RegionNode {
                opcodes: Opcodes::default(),
                regions: Some(vec![None, Some(leaf("a.wav", None))]),
            }),
        ];
        let regions = consolidate(&tree);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].sample.as_deref(), Some("a.wav"));
    }

    #[test]
    fn test_list_assets_deduplicates() {
        let regions = consolidate(&[
            Some(leaf("a.wav", None)),
            Some(leaf("b.wav", None)),
            Some(leaf("a.wav", Some(-1.0))),
            Some(RegionNode::leaf(Opcodes {
                lokey: Some(1),
                ..Default::default()
            })),
        ]);
        let assets = list_assets(&regions);
        assert_eq!(assets.len(), 2);
        assert!(assets.contains("a.wav"));
        assert!(assets.contains("b.wav"));
    }

    #[test]
    fn test_asset_requests_use_base_url() {
        let regions = consolidate(&[Some(leaf("a.wav", None))]);
        let requests = asset_requests(&regions, "/piano/");
        assert_eq!(
            requests,
            vec![AssetRequest {
                sample: "a.wav".to_string(),
                path: "/piano/a.wav".to_string(),
            }]
        );
    }
}
