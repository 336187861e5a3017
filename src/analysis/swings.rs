use serde::Serialize;

use crate::analysis::peaks::find_extrema;
use crate::data::TurningKind;

/// Turning point of an extracted cycle component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwingPoint {
    pub index: usize,
    pub value: f64,
    pub kind: TurningKind,
}

/// Alternating peaks and troughs of a cycle component.
///
/// Extrema of one kind closer than `0.4 * wavelength` are thinned from the most extreme down;
/// two neighbours of the same kind collapse into the more extreme one so the result strictly
/// alternates.
pub fn detect_swings(component: &[f64], wavelength: f64) -> Vec<SwingPoint> {
    let min_distance = ((0.4 * wavelength).floor() as usize).max(1);

    let mut points: Vec<SwingPoint> = [TurningKind::Peak, TurningKind::Trough]
        .into_iter()
        .flat_map(|kind| {
            find_extrema(component, kind, min_distance, 0.0)
                .into_iter()
                .map(move |e| SwingPoint {
                    index: e.index,
                    value: e.value,
                    kind,
                })
        })
        .collect();
    points.sort_by_key(|p| p.index);

    let mut swings: Vec<SwingPoint> = Vec::with_capacity(points.len());
    for point in points {
        push_swing(&mut swings, point);
    }
    swings
}

fn push_swing(swings: &mut Vec<SwingPoint>, swing: SwingPoint) {
    if let Some(last) = swings.last_mut() {
        if last.kind == swing.kind {
            let more_extreme = match swing.kind {
                TurningKind::Peak => swing.value > last.value,
                TurningKind::Trough => swing.value < last.value,
            };
            if more_extreme {
                *last = swing;
            }
            return;
        }
    }
    swings.push(swing);
}

/// Absolute value changes between successive swings.
pub fn swing_amplitudes(swings: &[SwingPoint]) -> Vec<f64> {
    swings
        .windows(2)
        .map(|pair| (pair[1].value - pair[0].value).abs())
        .collect()
}

/// Bar distances between successive swings of the same kind.
pub fn same_kind_spacings(swings: &[SwingPoint]) -> Vec<f64> {
    let spacing = |kind: TurningKind| {
        let indices: Vec<usize> = swings
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.index)
            .collect();
        indices
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) as f64)
            .collect::<Vec<f64>>()
    };
    let mut spacings = spacing(TurningKind::Peak);
    spacings.extend(spacing(TurningKind::Trough));
    spacings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn sine_swings_alternate_at_half_wavelength() {
        let wave: Vec<f64> = (0..200).map(|t| (2.0 * PI * t as f64 / 40.0).sin()).collect();
        let swings = detect_swings(&wave, 40.0);
        assert!(swings.len() >= 8);
        for pair in swings.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
            assert_eq!(pair[1].index - pair[0].index, 20);
        }
        assert!(same_kind_spacings(&swings).iter().all(|s| *s == 40.0));
        assert!(swing_amplitudes(&swings)
            .iter()
            .all(|a| (a - 2.0).abs() < 1e-9));
    }

    #[test]
    fn same_kind_neighbours_collapse() {
        let mut swings = Vec::new();
        push_swing(&mut swings, SwingPoint { index: 1, value: 1.0, kind: TurningKind::Peak });
        push_swing(&mut swings, SwingPoint { index: 4, value: 2.0, kind: TurningKind::Peak });
        push_swing(&mut swings, SwingPoint { index: 6, value: -1.0, kind: TurningKind::Trough });
        assert_eq!(swings.len(), 2);
        assert_eq!(swings[0].index, 4);
    }
}
