use geo::{Area, Coord, Intersects, Line, LineString, Point, Polygon, Rect};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("Longitude values must be between -180 and 180")]
    Longitude,
    #[error("Latitude values must be between -90 and 90")]
    Latitude,
    #[error("Min values must be <= max values")]
    Order,
    #[error("Region needs at least 3 distinct vertices, found {0}")]
    TooFewVertices(usize),
    #[error("Region vertex {0} has non-finite coordinates")]
    NonFinite(usize),
    #[error("Region edges {0} and {1} intersect")]
    SelfIntersecting(usize, usize),
    #[error("Region has zero area")]
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bbox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Bbox {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self, RegionError> {
        if !(-180.0..=180.0).contains(&xmin) || !(-180.0..=180.0).contains(&xmax) {
            return Err(RegionError::Longitude);
        }

        if !(-90.0..=90.0).contains(&ymin) || !(-90.0..=90.0).contains(&ymax) {
            return Err(RegionError::Latitude);
        }

        if xmin > xmax || ymin > ymax {
            return Err(RegionError::Order);
        }

        Ok(Bbox {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.xmin,
                y: self.ymin,
            },
            Coord {
                x: self.xmax,
                y: self.ymax,
            },
        )
    }
}

/// Closed polygon bounding every query and clip of a session.
#[derive(Debug, Clone)]
pub struct Region {
    polygon: Polygon<f64>,
    bbox: Bbox,
}

impl Region {
    /// Builds a region from (lon, lat) vertices. The ring is closed
    /// automatically when the last vertex differs from the first.
    pub fn new(vertices: &[(f64, f64)]) -> Result<Self, RegionError> {
        if let Some(i) = vertices
            .iter()
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(RegionError::NonFinite(i));
        }

        let mut ring: Vec<(f64, f64)> = vertices.to_vec();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        ring.dedup();

        if ring.len() < 3 {
            return Err(RegionError::TooFewVertices(ring.len()));
        }

        let xmin = ring.iter().map(|v| v.0).fold(f64::INFINITY, f64::min);
        let xmax = ring.iter().map(|v| v.0).fold(f64::NEG_INFINITY, f64::max);
        let ymin = ring.iter().map(|v| v.1).fold(f64::INFINITY, f64::min);
        let ymax = ring.iter().map(|v| v.1).fold(f64::NEG_INFINITY, f64::max);
        let bbox = Bbox::new(xmin, xmax, ymin, ymax)?;

        let polygon = Polygon::new(LineString::from(ring), vec![]);

        check_simple(polygon.exterior())?;

        if polygon.unsigned_area() == 0.0 {
            return Err(RegionError::Degenerate);
        }

        Ok(Region { polygon, bbox })
    }

    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }

    /// Boundary points count as inside.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.polygon.intersects(&Point::new(lon, lat))
    }

    pub fn intersects_bbox(&self, bbox: &Bbox) -> bool {
        self.polygon.intersects(&bbox.to_rect())
    }
}

// Non-adjacent edges of the ring must not touch.
fn check_simple(ring: &LineString<f64>) -> Result<(), RegionError> {
    let edges: Vec<Line<f64>> = ring.lines().collect();
    let n = edges.len();

    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return Err(RegionError::SelfIntersecting(i, j));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn square() -> Vec<(f64, f64)> {
        vec![(90.0, 23.0), (91.0, 23.0), (91.0, 24.0), (90.0, 24.0)]
    }

    #[test]
    fn test_bbox_coords_are_within_ranges() {
        // Test valid coordinates
        let valid_bbox = Bbox::new(-67.2, -58.7, 70.9, 73.3);
        assert!(valid_bbox.is_ok());

        // Test longitude out of range
        assert_eq!(
            Bbox::new(-200.0, 0.0, 0.0, 10.0).unwrap_err(),
            RegionError::Longitude
        );
        assert!(Bbox::new(0.0, 200.0, 0.0, 10.0).is_err());

        // Test latitude out of range
        assert_eq!(
            Bbox::new(0.0, 10.0, -100.0, 0.0).unwrap_err(),
            RegionError::Latitude
        );
        assert!(Bbox::new(0.0, 10.0, 0.0, 100.0).is_err());

        // Test min > max
        assert_eq!(
            Bbox::new(10.0, 0.0, 0.0, 10.0).unwrap_err(),
            RegionError::Order
        );
        assert!(Bbox::new(0.0, 10.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn test_region_open_and_closed_rings_are_equivalent() {
        let open = Region::new(&square()).unwrap();

        let mut closed_ring = square();
        closed_ring.push(closed_ring[0]);
        let closed = Region::new(&closed_ring).unwrap();

        assert_eq!(open.bbox(), closed.bbox());
        assert_eq!(open.bbox(), &Bbox::new(90.0, 91.0, 23.0, 24.0).unwrap());
    }

    #[test]
    fn test_region_rejects_invalid_polygons() {
        assert_eq!(
            Region::new(&[]).unwrap_err(),
            RegionError::TooFewVertices(0)
        );
        assert_eq!(
            Region::new(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).unwrap_err(),
            RegionError::TooFewVertices(2)
        );
        assert_eq!(
            Region::new(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).unwrap_err(),
            RegionError::Degenerate
        );
        assert_eq!(
            Region::new(&[(0.0, 0.0), (f64::NAN, 1.0), (2.0, 2.0)]).unwrap_err(),
            RegionError::NonFinite(1)
        );

        // Bow tie
        let bow_tie = [(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)];
        assert!(matches!(
            Region::new(&bow_tie).unwrap_err(),
            RegionError::SelfIntersecting(_, _)
        ));
    }

    #[test]
    fn test_region_contains_and_intersects() {
        let region = Region::new(&square()).unwrap();

        assert!(region.contains(90.5, 23.5));
        assert!(region.contains(90.0, 23.5));
        assert!(!region.contains(92.0, 23.5));

        let overlapping = Bbox::new(90.8, 92.0, 23.8, 25.0).unwrap();
        let disjoint = Bbox::new(10.0, 11.0, 10.0, 11.0).unwrap();
        assert!(region.intersects_bbox(&overlapping));
        assert!(!region.intersects_bbox(&disjoint));
    }
}
