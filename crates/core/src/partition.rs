//! Region partitioning: who preprocesses which part of the map.
//!
//! Overlapping files would otherwise preprocess the same cells twice.
//! The partitioner walks the files in caller order, snaps each
//! footprint outward onto the grid, and subtracts everything already
//! claimed by earlier files. The first file always keeps its full
//! snapped box; later files only keep what is left.
//!
//! Order dependence is deliberate: the caller decides file priority by
//! ordering the input.

use crate::geometry::{BoundingBox, GridSpec};
use crate::types::DbId;

/// The grid-aligned portions of one file that still need preprocessing.
///
/// An empty `regions` list means the file is entirely covered by
/// earlier files and no work is required for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRegionSet {
    pub file_id: DbId,
    pub regions: Vec<BoundingBox>,
}

impl FileRegionSet {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Partition the files' footprints into disjoint, grid-aligned regions.
///
/// Returns one [`FileRegionSet`] per input file, in input order. The
/// union of all emitted regions for a file equals its snapped bounding
/// box minus everything claimed by earlier files; regions of distinct
/// files never overlap.
///
/// Claim state lives entirely within one call: independent groups must
/// be partitioned by independent calls.
pub fn partition(files: &[(DbId, BoundingBox)], grid: &GridSpec) -> Vec<FileRegionSet> {
    let mut claimed: Vec<BoundingBox> = Vec::new();
    let mut result = Vec::with_capacity(files.len());

    for (file_id, raw_box) in files {
        let snapped = raw_box.snap_to_grid(grid);

        let mut survivors = vec![snapped];
        for zone in &claimed {
            survivors = subtract_from_all(&survivors, zone);
            if survivors.is_empty() {
                break;
            }
        }

        claimed.extend_from_slice(&survivors);
        result.push(FileRegionSet {
            file_id: *file_id,
            regions: survivors,
        });
    }

    result
}

/// Subtract one claimed rectangle from every fragment in `regions`,
/// carrying forward the surviving pieces.
fn subtract_from_all(regions: &[BoundingBox], obstacle: &BoundingBox) -> Vec<BoundingBox> {
    let mut next = Vec::with_capacity(regions.len());
    for region in regions {
        next.extend(region.subtract(obstacle));
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> BoundingBox {
        BoundingBox::new(x_min, x_max, y_min, y_max).unwrap()
    }

    fn grid(cell: f64) -> GridSpec {
        GridSpec {
            cell_width: cell,
            cell_height: cell,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }

    fn total_area(set: &FileRegionSet) -> f64 {
        set.regions.iter().map(BoundingBox::area).sum()
    }

    #[test]
    fn first_file_keeps_its_full_snapped_box() {
        let sets = partition(&[(1, bbox(0.3, 9.7, 0.3, 9.7))], &grid(1.0));
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].regions, vec![bbox(0.0, 10.0, 0.0, 10.0)]);
    }

    #[test]
    fn disjoint_files_each_keep_one_region() {
        let sets = partition(
            &[(1, bbox(0.0, 10.0, 0.0, 10.0)), (2, bbox(20.0, 30.0, 0.0, 10.0))],
            &grid(1.0),
        );
        assert_eq!(sets[0].regions, vec![bbox(0.0, 10.0, 0.0, 10.0)]);
        assert_eq!(sets[1].regions, vec![bbox(20.0, 30.0, 0.0, 10.0)]);
    }

    #[test]
    fn partial_overlap_leaves_only_the_uncovered_slice() {
        let sets = partition(
            &[(1, bbox(0.0, 100.0, 0.0, 10.0)), (2, bbox(95.0, 110.0, 0.0, 10.0))],
            &grid(1.0),
        );
        assert_eq!(sets[0].regions, vec![bbox(0.0, 100.0, 0.0, 10.0)]);
        assert_eq!(sets[1].regions, vec![bbox(100.0, 110.0, 0.0, 10.0)]);
    }

    #[test]
    fn fully_contained_file_gets_no_regions() {
        let sets = partition(
            &[(1, bbox(0.0, 100.0, 0.0, 100.0)), (2, bbox(20.0, 80.0, 20.0, 80.0))],
            &grid(1.0),
        );
        assert_eq!(sets[0].regions.len(), 1);
        assert!(sets[1].is_empty());
    }

    #[test]
    fn small_first_file_punches_hole_into_larger_second() {
        let sets = partition(
            &[(1, bbox(40.0, 60.0, 40.0, 60.0)), (2, bbox(0.0, 100.0, 0.0, 100.0))],
            &grid(2.0),
        );
        assert_eq!(sets[0].regions, vec![bbox(40.0, 60.0, 40.0, 60.0)]);
        // Top/bottom full-width strips plus left/right strips bounded
        // to [40, 60] in Y.
        assert_eq!(sets[1].regions.len(), 4);
        assert!(sets[1].regions.contains(&bbox(0.0, 100.0, 60.0, 100.0)));
        assert!(sets[1].regions.contains(&bbox(0.0, 100.0, 0.0, 40.0)));
        assert!(sets[1].regions.contains(&bbox(0.0, 40.0, 40.0, 60.0)));
        assert!(sets[1].regions.contains(&bbox(60.0, 100.0, 40.0, 60.0)));
    }

    #[test]
    fn later_regions_never_overlap_earlier_claims() {
        let files = [
            (1, bbox(0.0, 50.0, 0.0, 50.0)),
            (2, bbox(30.0, 80.0, 30.0, 80.0)),
            (3, bbox(10.0, 90.0, 10.0, 90.0)),
        ];
        let sets = partition(&files, &grid(5.0));

        for i in 0..sets.len() {
            for j in (i + 1)..sets.len() {
                for a in &sets[i].regions {
                    for b in &sets[j].regions {
                        assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn emitted_area_covers_each_snapped_box_exactly_once() {
        let files = [
            (1, bbox(0.0, 40.0, 0.0, 40.0)),
            (2, bbox(20.0, 60.0, 0.0, 40.0)),
        ];
        let sets = partition(&files, &grid(10.0));

        assert_eq!(total_area(&sets[0]), 40.0 * 40.0);
        // The second file only keeps the 20-unit slice beyond x = 40.
        assert_eq!(total_area(&sets[1]), 20.0 * 40.0);
    }

    #[test]
    fn independent_calls_do_not_share_claim_state() {
        let files = [(1, bbox(0.0, 10.0, 0.0, 10.0))];
        let first = partition(&files, &grid(1.0));
        // Identical coordinates in an unrelated group: still gets its
        // full snapped box, nothing carried over from the prior call.
        let second = partition(&files, &grid(1.0));
        assert_eq!(first, second);
        assert_eq!(second[0].regions, vec![bbox(0.0, 10.0, 0.0, 10.0)]);
    }

    #[test]
    fn unaligned_footprints_snap_before_subtraction() {
        let sets = partition(
            &[(1, bbox(0.0, 10.2, 0.0, 10.0)), (2, bbox(10.5, 20.0, 0.0, 10.0))],
            &grid(1.0),
        );
        // The first file's snapped box reaches x = 11, so the second
        // file starts there even though its raw footprint starts at 10.5.
        assert_eq!(sets[0].regions, vec![bbox(0.0, 11.0, 0.0, 10.0)]);
        assert_eq!(sets[1].regions, vec![bbox(11.0, 20.0, 0.0, 10.0)]);
    }
}
