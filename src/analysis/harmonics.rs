use serde::Serialize;

use crate::data::Wavelength;

/// Integer period ratios treated as harmonic relationships.
pub const HARMONIC_RATIOS: [u32; 3] = [2, 3, 4];
/// Allowed relative deviation from an exact harmonic ratio.
pub const HARMONIC_TOLERANCE: f64 = 0.15;

/// Group of cycles connected by harmonic period ratios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonicFamily {
    pub id: usize,
    /// Members ordered by wavelength, shortest first.
    pub members: Vec<Wavelength>,
}

impl HarmonicFamily {
    pub fn is_orphan(&self) -> bool {
        self.members.len() < 2
    }

    /// Number of other cycles in the family.
    pub fn partners(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Longest member.
    pub fn fundamental(&self) -> Option<Wavelength> {
        self.members.last().copied()
    }

    pub fn contains(&self, wavelength: Wavelength) -> bool {
        self.members
            .iter()
            .any(|m| (m.bars() - wavelength.bars()).abs() <= 1e-9)
    }
}

/// Harmonic ratio between two periods, if they are within tolerance of 2:1, 3:1 or 4:1.
pub fn harmonic_ratio(a: Wavelength, b: Wavelength) -> Option<u32> {
    let (short, long) = if a.bars() <= b.bars() {
        (a.bars(), b.bars())
    } else {
        (b.bars(), a.bars())
    };
    let ratio = long / short;
    HARMONIC_RATIOS
        .into_iter()
        .find(|&k| (ratio / k as f64 - 1.0).abs() <= HARMONIC_TOLERANCE)
}

/// Connected components of the "is a harmonic of" relation, in order of first appearance.
pub fn harmonic_families(wavelengths: &[Wavelength]) -> Vec<HarmonicFamily> {
    let n = wavelengths.len();
    let mut parent: Vec<usize> = (0..n).collect();

    for i in 0..n {
        for j in i + 1..n {
            if harmonic_ratio(wavelengths[i], wavelengths[j]).is_some() {
                let (ri, rj) = (find_root(&mut parent, i), find_root(&mut parent, j));
                if ri != rj {
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut roots: Vec<usize> = Vec::new();
    let mut groups: Vec<Vec<Wavelength>> = Vec::new();
    for (i, wavelength) in wavelengths.iter().enumerate() {
        let root = find_root(&mut parent, i);
        match roots.iter().position(|r| *r == root) {
            Some(slot) => groups[slot].push(*wavelength),
            None => {
                roots.push(root);
                groups.push(vec![*wavelength]);
            }
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(id, mut members)| {
            members.sort_by(|a, b| a.bars().total_cmp(&b.bars()));
            HarmonicFamily { id, members }
        })
        .collect()
}

fn find_root(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

/// Family containing `wavelength`; a lone orphan family when it was not among the inputs.
pub fn family_of(families: &[HarmonicFamily], wavelength: Wavelength) -> HarmonicFamily {
    families
        .iter()
        .find(|f| f.contains(wavelength))
        .cloned()
        .unwrap_or(HarmonicFamily {
            id: families.len(),
            members: vec![wavelength],
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(bars: f64) -> Wavelength {
        Wavelength::new(bars).unwrap()
    }

    #[test]
    fn ratios_within_tolerance() {
        assert_eq!(harmonic_ratio(w(20.0), w(40.0)), Some(2));
        assert_eq!(harmonic_ratio(w(66.0), w(20.0)), Some(3));
        assert_eq!(harmonic_ratio(w(25.0), w(100.0)), Some(4));
        assert_eq!(harmonic_ratio(w(20.0), w(30.0)), None);
        assert_eq!(harmonic_ratio(w(20.0), w(110.0)), None);
    }

    #[test]
    fn families_are_transitive_and_orphans_flagged() {
        let families = harmonic_families(&[w(40.0), w(30.0), w(20.0), w(160.0)]);
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].members, vec![w(20.0), w(40.0), w(160.0)]);
        assert_eq!(families[0].partners(), 2);
        assert_eq!(families[0].fundamental(), Some(w(160.0)));
        assert!(families[1].is_orphan());
        assert!(family_of(&families, w(30.0)).is_orphan());
        assert!(family_of(&families, w(500.0)).is_orphan());
    }
}
