//! Radius clustering of user reports
//!
//! Points are projected to world pixels at the current zoom and grouped
//! greedily: reports are visited in id order and each unassigned report
//! seeds a cluster from every unassigned report within `radius_px`.
//! Visiting in id order makes the result independent of input order.

use crate::core::config::ClusteringConfig;
use crate::core::geo::{LatLng, Point};
use crate::core::viewport::ZoomLevel;
use crate::data::model::{ClusterItem, CongestionLevel, PlaceItem};
use crate::spatial::index::{SpatialIndex, SpatialItem};
use crate::traits::Configurable;
use crate::{MapError, Result};

/// Partition of a report list into plain markers and clusters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutcome {
    pub singles: Vec<PlaceItem>,
    pub clusters: Vec<ClusterItem>,
}

impl ClusterOutcome {
    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.clusters.is_empty()
    }

    /// Number of places represented, counting cluster members
    pub fn place_count(&self) -> usize {
        self.singles.len() + self.clusters.iter().map(|c| c.count).sum::<usize>()
    }
}

/// Worst level among the members; `None` if no member reports one
pub fn dominant_congestion<I>(levels: I) -> Option<CongestionLevel>
where
    I: IntoIterator<Item = Option<CongestionLevel>>,
{
    levels.into_iter().flatten().max()
}

pub struct Clusterer {
    config: ClusteringConfig,
}

impl Clusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled_at(&self, zoom: ZoomLevel) -> bool {
        zoom.value() < self.config.disable_at_zoom
    }

    pub fn cluster(&self, places: &[PlaceItem], zoom: ZoomLevel) -> ClusterOutcome {
        let mut ordered: Vec<&PlaceItem> = places.iter().collect();
        ordered.sort_by(|a, b| {
            a.id.cmp(&b.id).then_with(|| {
                a.coordinate
                    .quantized(9)
                    .cmp(&b.coordinate.quantized(9))
            })
        });

        if !self.is_enabled_at(zoom) || ordered.len() < self.config.min_cluster_size {
            return ClusterOutcome {
                singles: ordered.into_iter().cloned().collect(),
                clusters: Vec::new(),
            };
        }

        let z = zoom.as_f64();
        let projected: Vec<Point> = ordered.iter().map(|p| p.coordinate.to_world_pixel(z)).collect();
        let index = SpatialIndex::bulk_load(
            projected
                .iter()
                .enumerate()
                .map(|(slot, point)| SpatialItem::new(ordered[slot].id.clone(), *point, slot))
                .collect(),
        );

        let mut assigned = vec![false; ordered.len()];
        let mut outcome = ClusterOutcome::default();

        for seed in 0..ordered.len() {
            if assigned[seed] {
                continue;
            }
            let mut members: Vec<usize> = index
                .query_radius(&projected[seed], self.config.radius_px)
                .into_iter()
                .map(|item| item.data)
                .filter(|&slot| !assigned[slot])
                .collect();
            members.sort_unstable();

            if members.len() < self.config.min_cluster_size {
                assigned[seed] = true;
                outcome.singles.push(ordered[seed].clone());
                continue;
            }

            for &slot in &members {
                assigned[slot] = true;
            }
            outcome.clusters.push(self.build_cluster(&ordered, &projected, &members, z));
        }

        log::debug!(
            "clustered {} reports at {} into {} singles and {} clusters",
            places.len(),
            zoom,
            outcome.singles.len(),
            outcome.clusters.len()
        );
        outcome
    }

    fn build_cluster(
        &self,
        ordered: &[&PlaceItem],
        projected: &[Point],
        members: &[usize],
        zoom: f64,
    ) -> ClusterItem {
        let n = members.len() as f64;
        let (sx, sy) = members
            .iter()
            .fold((0.0, 0.0), |(x, y), &slot| (x + projected[slot].x, y + projected[slot].y));
        let centroid = LatLng::from_world_pixel(Point::new(sx / n, sy / n), zoom);

        ClusterItem {
            coordinate: centroid,
            count: members.len(),
            congestion: dominant_congestion(members.iter().map(|&slot| ordered[slot].congestion)),
            member_ids: members.iter().map(|&slot| ordered[slot].id.clone()).collect(),
        }
    }
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::new(ClusteringConfig::default())
    }
}

impl Configurable for Clusterer {
    type Config = ClusteringConfig;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn set_config(&mut self, config: Self::Config) -> Result<()> {
        Self::validate_config(&config)?;
        self.config = config;
        Ok(())
    }

    fn validate_config(config: &Self::Config) -> Result<()> {
        if config.radius_px <= 0.0 || !config.radius_px.is_finite() {
            return Err(MapError::Config(format!(
                "invalid cluster radius {}",
                config.radius_px
            )));
        }
        if config.min_cluster_size < 2 {
            return Err(MapError::Config("min_cluster_size must be at least 2".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::PlaceKind;

    fn report(id: &str, lat: f64, lng: f64, level: Option<CongestionLevel>) -> PlaceItem {
        let mut item = PlaceItem::new(PlaceKind::User, id, id, LatLng::new(lat, lng));
        item.congestion = level;
        item
    }

    fn dense_block() -> Vec<PlaceItem> {
        vec![
            report("a", 37.5665, 126.9780, Some(CongestionLevel::Relaxed)),
            report("b", 37.5666, 126.9781, Some(CongestionLevel::Crowded)),
            report("c", 37.5664, 126.9779, None),
            report("far", 37.6500, 127.0500, Some(CongestionLevel::Busy)),
        ]
    }

    #[test]
    fn test_nearby_reports_form_one_cluster() {
        let outcome = Clusterer::default().cluster(&dense_block(), ZoomLevel::new(13));

        assert_eq!(outcome.clusters.len(), 1);
        assert_eq!(outcome.clusters[0].count, 3);
        assert_eq!(outcome.clusters[0].member_ids, vec!["a", "b", "c"]);
        assert_eq!(outcome.clusters[0].congestion, Some(CongestionLevel::Crowded));
        assert_eq!(outcome.singles.len(), 1);
        assert_eq!(outcome.singles[0].id, "far");
        assert_eq!(outcome.place_count(), 4);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let clusterer = Clusterer::default();
        let mut shuffled = dense_block();
        shuffled.reverse();

        let first = clusterer.cluster(&dense_block(), ZoomLevel::new(13));
        let second = clusterer.cluster(&shuffled, ZoomLevel::new(13));
        let third = clusterer.cluster(&dense_block(), ZoomLevel::new(13));

        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_disabled_at_high_zoom() {
        let clusterer = Clusterer::default();
        let outcome = clusterer.cluster(&dense_block(), ZoomLevel::new(17));
        assert!(outcome.clusters.is_empty());
        assert_eq!(outcome.singles.len(), 4);
    }

    #[test]
    fn test_min_cluster_size() {
        let clusterer = Clusterer::new(ClusteringConfig {
            min_cluster_size: 4,
            ..ClusteringConfig::default()
        });
        let outcome = clusterer.cluster(&dense_block(), ZoomLevel::new(13));
        assert!(outcome.clusters.is_empty());
    }

    #[test]
    fn test_dominant_congestion_ignores_unknown() {
        assert_eq!(dominant_congestion(vec![None, None]), None);
        assert_eq!(
            dominant_congestion(vec![Some(CongestionLevel::Normal), None, Some(CongestionLevel::Busy)]),
            Some(CongestionLevel::Busy)
        );
    }

    #[test]
    fn test_config_validation() {
        let mut clusterer = Clusterer::default();
        assert!(clusterer.update_config(|c| c.radius_px = -1.0).is_err());
        assert!(clusterer.update_config(|c| c.radius_px = 40.0).is_ok());
        assert_eq!(clusterer.config().radius_px, 40.0);
    }
}
