//! Uniform latitude/longitude grid index
//!
//! Lots are bucketed into square cells of `cell_size_degrees`. A radius
//! query derives the spherical bounding box of the search circle, collects
//! candidates from the covered cells and keeps those whose haversine
//! distance is within the radius. The bounding box is conservative, so the
//! exact check only ever removes false positives.
//!
//! Longitudes wrap at the antimeridian; a circle that reaches a pole covers
//! every longitude.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::geo::{validate_radius, Coordinates, EARTH_RADIUS_METERS};
use crate::domain::parking_lot::{GeoHit, GeoIndex, LotId};
use crate::shared::errors::{DomainError, DomainResult};

/// Widening applied to every bounding box edge, in degrees (about 1 cm).
const BOUND_PADDING_DEGREES: f64 = 1e-7;

type CellKey = (i32, i32);

#[derive(Default)]
struct GridState {
    cells: HashMap<CellKey, HashSet<LotId>>,
    positions: HashMap<LotId, (Coordinates, CellKey)>,
}

impl GridState {
    fn detach(&mut self, lot_id: LotId) -> bool {
        let Some((_, key)) = self.positions.remove(&lot_id) else {
            return false;
        };
        if let Some(bucket) = self.cells.get_mut(&key) {
            bucket.remove(&lot_id);
            if bucket.is_empty() {
                self.cells.remove(&key);
            }
        }
        true
    }
}

/// Longitude columns touched by a query.
#[derive(Debug, Clone, PartialEq)]
enum ColumnSpan {
    All,
    /// Inclusive column ranges; two of them when the circle crosses the
    /// antimeridian.
    Ranges(Vec<(i32, i32)>),
}

#[derive(Debug, Clone, PartialEq)]
struct SearchWindow {
    min_row: i32,
    max_row: i32,
    columns: ColumnSpan,
}

pub struct GridGeoIndex {
    cell_size_degrees: f64,
    columns: i32,
    state: RwLock<GridState>,
}

impl GridGeoIndex {
    pub const DEFAULT_CELL_SIZE_DEGREES: f64 = 0.01;
    /// About 1 m at the equator. Keeps row and column numbers, and the
    /// window arithmetic over them, well inside `i32`.
    pub const MIN_CELL_SIZE_DEGREES: f64 = 1e-5;
    pub const MAX_CELL_SIZE_DEGREES: f64 = 90.0;

    /// Create an index whose cells span `cell_size_degrees` on each side.
    pub fn new(cell_size_degrees: f64) -> DomainResult<Self> {
        if !(cell_size_degrees.is_finite()
            && (Self::MIN_CELL_SIZE_DEGREES..=Self::MAX_CELL_SIZE_DEGREES)
                .contains(&cell_size_degrees))
        {
            return Err(DomainError::InvalidArgument(format!(
                "cell size {} must be within [{}, {}] degrees",
                cell_size_degrees,
                Self::MIN_CELL_SIZE_DEGREES,
                Self::MAX_CELL_SIZE_DEGREES
            )));
        }
        Ok(Self {
            cell_size_degrees,
            columns: (360.0 / cell_size_degrees).ceil() as i32,
            state: RwLock::new(GridState::default()),
        })
    }

    /// Number of indexed lots
    pub async fn len(&self) -> usize {
        self.state.read().await.positions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn row(&self, latitude: f64) -> i32 {
        ((latitude + 90.0) / self.cell_size_degrees).floor() as i32
    }

    /// Column of a longitude in [-180, 180]. Clamped so that both 180 and
    /// -180 land in a valid column and ordering is preserved.
    fn column(&self, longitude: f64) -> i32 {
        (((longitude + 180.0) / self.cell_size_degrees).floor() as i32).clamp(0, self.columns - 1)
    }

    fn cell(&self, coordinates: &Coordinates) -> CellKey {
        (self.row(coordinates.latitude), self.column(coordinates.longitude))
    }

    /// Cells covering the circle, or `None` when the circle covers the globe.
    fn window(&self, center: &Coordinates, radius_meters: f64) -> Option<SearchWindow> {
        let angular = radius_meters / EARTH_RADIUS_METERS;
        if angular >= PI {
            return None;
        }

        let delta_lat = angular.to_degrees() + BOUND_PADDING_DEGREES;
        let min_lat = center.latitude - delta_lat;
        let max_lat = center.latitude + delta_lat;

        let columns = if min_lat <= -90.0 || max_lat >= 90.0 {
            ColumnSpan::All
        } else {
            let ratio = angular.sin() / center.latitude.to_radians().cos();
            if ratio >= 1.0 {
                ColumnSpan::All
            } else {
                let delta_lon = ratio.asin().to_degrees() + BOUND_PADDING_DEGREES;
                let west = center.longitude - delta_lon;
                let east = center.longitude + delta_lon;
                if east - west >= 360.0 {
                    ColumnSpan::All
                } else if west < -180.0 {
                    ColumnSpan::Ranges(vec![
                        (0, self.column(east)),
                        (self.column(west + 360.0), self.columns - 1),
                    ])
                } else if east > 180.0 {
                    ColumnSpan::Ranges(vec![
                        (self.column(west), self.columns - 1),
                        (0, self.column(east - 360.0)),
                    ])
                } else {
                    ColumnSpan::Ranges(vec![(self.column(west), self.column(east))])
                }
            }
        };

        Some(SearchWindow {
            min_row: self.row(min_lat.max(-90.0)),
            max_row: self.row(max_lat.min(90.0)),
            columns,
        })
    }

    fn collect_within(
        state: &GridState,
        ids: impl Iterator<Item = LotId>,
        center: &Coordinates,
        radius_meters: f64,
        hits: &mut Vec<GeoHit>,
    ) {
        for lot_id in ids {
            if let Some((position, _)) = state.positions.get(&lot_id) {
                let distance_meters = center.distance_to(position);
                if distance_meters <= radius_meters {
                    hits.push(GeoHit {
                        lot_id,
                        distance_meters,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl GeoIndex for GridGeoIndex {
    async fn insert(&self, lot_id: LotId, coordinates: Coordinates) -> DomainResult<()> {
        let key = self.cell(&coordinates);
        let mut state = self.state.write().await;
        state.detach(lot_id);
        state.cells.entry(key).or_default().insert(lot_id);
        state.positions.insert(lot_id, (coordinates, key));
        Ok(())
    }

    async fn remove(&self, lot_id: LotId) -> DomainResult<()> {
        self.state.write().await.detach(lot_id);
        Ok(())
    }

    async fn query(&self, center: Coordinates, radius_meters: f64) -> DomainResult<Vec<GeoHit>> {
        center.validate()?;
        validate_radius(radius_meters)?;

        let window = self.window(&center, radius_meters);
        let state = self.state.read().await;
        let mut hits = Vec::new();

        let ranges = window.map(|w| {
            let columns = match w.columns {
                ColumnSpan::All => vec![(0, self.columns - 1)],
                ColumnSpan::Ranges(ranges) => ranges,
            };
            (w.min_row, w.max_row, columns)
        });
        let cell_count = ranges.as_ref().map(|(min_row, max_row, columns)| {
            let rows = i64::from(max_row - min_row + 1);
            let cols: i64 = columns
                .iter()
                .map(|(start, end)| i64::from(end - start + 1))
                .sum();
            rows * cols
        });

        match (ranges, cell_count) {
            (Some((min_row, max_row, columns)), Some(cells))
                if cells <= state.cells.len() as i64 =>
            {
                for row in min_row..=max_row {
                    for col in columns.iter().flat_map(|&(start, end)| start..=end) {
                        if let Some(bucket) = state.cells.get(&(row, col)) {
                            Self::collect_within(
                                &state,
                                bucket.iter().copied(),
                                &center,
                                radius_meters,
                                &mut hits,
                            );
                        }
                    }
                }
            }
            // The window spans more cells than are occupied: checking every
            // indexed lot is cheaper than walking empty cells.
            _ => {
                Self::collect_within(
                    &state,
                    state.positions.keys().copied(),
                    &center,
                    radius_meters,
                    &mut hits,
                );
            }
        }

        debug!(
            latitude = center.latitude,
            longitude = center.longitude,
            radius_meters,
            hits = hits.len(),
            "Geo index radius query"
        );

        Ok(hits)
    }

    async fn contains(&self, lot_id: LotId) -> bool {
        self.state.read().await.positions.contains_key(&lot_id)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::haversine_distance;

    /// Meters along the equator per degree of longitude.
    const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * PI / 180.0;

    fn at(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates {
            latitude,
            longitude,
        }
    }

    fn ids(mut hits: Vec<GeoHit>) -> Vec<LotId> {
        hits.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        hits.into_iter().map(|h| h.lot_id).collect()
    }

    #[tokio::test]
    async fn radius_query_keeps_only_lots_within_distance() {
        let index = GridGeoIndex::new(0.005).unwrap();
        index.insert(1, at(0.0, 500.0 / METERS_PER_DEGREE)).await.unwrap();
        index.insert(2, at(0.0, 1_500.0 / METERS_PER_DEGREE)).await.unwrap();
        index.insert(3, at(999.0 / METERS_PER_DEGREE, 0.0)).await.unwrap();

        let hits = index.query(at(0.0, 0.0), 1_000.0).await.unwrap();

        assert_eq!(ids(hits.clone()), vec![1, 3]);
        for hit in hits {
            assert!(hit.distance_meters <= 1_000.0);
        }
    }

    #[tokio::test]
    async fn distances_match_haversine() {
        let index = GridGeoIndex::new(0.01).unwrap();
        index.insert(5, at(41.3111, 69.2797)).await.unwrap();

        let hits = index.query(at(41.2995, 69.2401), 10_000.0).await.unwrap();
        assert_eq!(hits.len(), 1);
        let expected = haversine_distance(41.2995, 69.2401, 41.3111, 69.2797);
        assert!((hits[0].distance_meters - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn zero_radius_matches_exact_position_only() {
        let index = GridGeoIndex::new(0.01).unwrap();
        index.insert(1, at(10.0, 10.0)).await.unwrap();
        index.insert(2, at(10.0, 10.0001)).await.unwrap();

        let hits = index.query(at(10.0, 10.0), 0.0).await.unwrap();
        assert_eq!(ids(hits), vec![1]);
    }

    #[tokio::test]
    async fn query_wraps_across_antimeridian() {
        let index = GridGeoIndex::new(0.01).unwrap();
        index.insert(1, at(0.0, -179.999)).await.unwrap();
        index.insert(2, at(0.0, 179.0)).await.unwrap();

        let hits = index.query(at(0.0, 179.999), 500.0).await.unwrap();
        assert_eq!(ids(hits), vec![1]);
    }

    #[tokio::test]
    async fn query_near_pole_covers_all_longitudes() {
        let index = GridGeoIndex::new(0.01).unwrap();
        index.insert(1, at(89.999, 180.0)).await.unwrap();
        index.insert(2, at(89.999, 90.0)).await.unwrap();
        index.insert(3, at(89.0, 0.0)).await.unwrap();

        let hits = index.query(at(89.999, 0.0), 500.0).await.unwrap();
        assert_eq!(ids(hits), vec![2, 1]);
    }

    #[tokio::test]
    async fn reinsert_replaces_previous_position() {
        let index = GridGeoIndex::new(0.01).unwrap();
        index.insert(1, at(0.0, 0.0)).await.unwrap();
        index.insert(1, at(45.0, 45.0)).await.unwrap();

        assert!(index.query(at(0.0, 0.0), 1_000.0).await.unwrap().is_empty());
        assert_eq!(ids(index.query(at(45.0, 45.0), 1.0).await.unwrap()), vec![1]);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn remove_drops_lot() {
        let index = GridGeoIndex::new(0.01).unwrap();
        index.insert(1, at(1.0, 1.0)).await.unwrap();
        index.remove(1).await.unwrap();
        index.remove(42).await.unwrap();

        assert!(!index.contains(1).await);
        assert!(index.is_empty().await);
        assert!(index.query(at(1.0, 1.0), 100.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_query_arguments_are_rejected() {
        let index = GridGeoIndex::new(0.01).unwrap();
        assert!(matches!(
            index.query(at(0.0, 0.0), -1.0).await,
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.query(at(95.0, 0.0), 10.0).await,
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.query(at(0.0, 200.0), 10.0).await,
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn invalid_cell_size_is_rejected() {
        assert!(GridGeoIndex::new(0.0).is_err());
        assert!(GridGeoIndex::new(-1.0).is_err());
        assert!(GridGeoIndex::new(120.0).is_err());
        assert!(GridGeoIndex::new(f64::NAN).is_err());
        assert!(GridGeoIndex::new(1e-9).is_err());
    }

    #[tokio::test]
    async fn finest_cells_query_near_south_pole() {
        let index = GridGeoIndex::new(GridGeoIndex::MIN_CELL_SIZE_DEGREES).unwrap();
        index.insert(1, at(-89.9999, 0.0)).await.unwrap();
        index.insert(2, at(-89.9999, 180.0)).await.unwrap();
        index.insert(3, at(-80.0, 0.0)).await.unwrap();

        let window = index.window(&at(-89.99995, 10.0), 50.0).unwrap();
        assert_eq!(window.columns, ColumnSpan::All);
        assert!(window.min_row >= 0);

        let hits = index.query(at(-89.99995, 10.0), 50.0).await.unwrap();
        let mut found = ids(hits);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn window_for_small_radius_is_a_narrow_range() {
        let index = GridGeoIndex::new(0.01).unwrap();
        let window = index.window(&at(41.3, 69.2), 1_000.0).unwrap();
        match window.columns {
            ColumnSpan::Ranges(ranges) => {
                assert_eq!(ranges.len(), 1);
                let (start, end) = ranges[0];
                assert!(end - start <= 3, "columns {}..={}", start, end);
            }
            ColumnSpan::All => panic!("expected a column range"),
        }
        assert!(window.max_row - window.min_row <= 3);
    }

    #[test]
    fn window_splits_at_antimeridian() {
        let index = GridGeoIndex::new(1.0).unwrap();
        let window = index.window(&at(0.0, 179.5), 200_000.0).unwrap();
        assert_eq!(
            window.columns,
            ColumnSpan::Ranges(vec![(357, 359), (0, 1)])
        );
    }

    #[test]
    fn window_for_half_globe_radius_is_unbounded() {
        let index = GridGeoIndex::new(1.0).unwrap();
        assert!(index.window(&at(0.0, 0.0), EARTH_RADIUS_METERS * PI).is_none());
    }

    #[tokio::test]
    async fn grid_matches_brute_force_scan() {
        let index = GridGeoIndex::new(0.5).unwrap();
        let mut points = Vec::new();
        let mut id: LotId = 0;
        let mut lat = -89.5;
        while lat < 90.0 {
            let mut lon = -179.7;
            while lon <= 180.0 {
                id += 1;
                let position = at(lat, lon);
                index.insert(id, position).await.unwrap();
                points.push((id, position));
                lon += 13.3;
            }
            lat += 7.9;
        }

        let centers = [
            at(0.0, 0.0),
            at(45.0, 179.9),
            at(-88.0, -10.0),
            at(60.0, -120.0),
        ];
        let radii = [0.0, 150_000.0, 900_000.0, 4_000_000.0, 19_000_000.0];

        for center in centers {
            for radius in radii {
                let mut expected: Vec<LotId> = points
                    .iter()
                    .filter(|(_, p)| center.distance_to(p) <= radius)
                    .map(|(id, _)| *id)
                    .collect();
                expected.sort_unstable();

                let mut actual: Vec<LotId> = index
                    .query(center, radius)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|h| h.lot_id)
                    .collect();
                actual.sort_unstable();

                assert_eq!(actual, expected, "center {:?} radius {}", center, radius);
            }
        }
    }
}
