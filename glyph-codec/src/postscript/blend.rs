//! Support for the CFF2 blend operator.

use types::F2Dot14;

use crate::error::CharstringError;

/// Extent of a variation region along one axis, in normalized coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionAxis {
    pub start: f64,
    pub peak: f64,
    pub end: f64,
}

/// A region of the design space in which a set of deltas applies.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariationRegion {
    pub axes: Vec<RegionAxis>,
}

impl VariationRegion {
    /// Computes the scalar for this region at the given location.
    ///
    /// See <https://learn.microsoft.com/en-us/typography/opentype/spec/otvaroverview#algorithm-for-interpolation-of-instance-values>
    pub fn compute_scalar(&self, coords: &[F2Dot14]) -> f64 {
        let mut scalar = 1.0;
        for (i, axis) in self.axes.iter().enumerate() {
            let coord = coords.get(i).map(|c| c.to_f32() as f64).unwrap_or(0.0);
            let RegionAxis { start, peak, end } = *axis;
            if start > peak || peak > end || peak == 0.0 || start < 0.0 && end > 0.0 {
                continue;
            } else if coord < start || coord > end {
                return 0.0;
            } else if coord == peak {
                continue;
            } else if coord < peak {
                scalar *= (coord - start) / (peak - start);
            } else {
                scalar *= (end - coord) / (end - peak);
            }
        }
        scalar
    }
}

/// Region references for one set of item variation data, selected in a
/// charstring with `vsindex`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemVariationData {
    pub region_indices: Vec<u16>,
}

/// The regions and variation data used by a CFF2 font.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariationStore {
    pub regions: Vec<VariationRegion>,
    pub data: Vec<ItemVariationData>,
}

/// State for processing the blend operator in charstrings.
///
/// Scalars for the active variation data are computed when the store index
/// changes. With no coordinates every scalar is zero and blends collapse to
/// the default design.
///
/// See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2charstr#45-variation-data-operators>
pub(crate) struct BlendState<'a> {
    store: &'a VariationStore,
    coords: &'a [F2Dot14],
    store_index: u16,
    scalars: Vec<f64>,
}

impl<'a> BlendState<'a> {
    pub(crate) fn new(
        store: &'a VariationStore,
        coords: &'a [F2Dot14],
        store_index: u16,
    ) -> Result<Self, CharstringError> {
        let mut state = Self {
            store,
            coords,
            store_index,
            scalars: Vec::new(),
        };
        state.update_scalars()?;
        Ok(state)
    }

    /// Sets the active variation store index.
    ///
    /// This should be called with the operand of the `vsindex` operator.
    pub(crate) fn set_store_index(&mut self, store_index: u16) -> Result<(), CharstringError> {
        if self.store_index != store_index {
            self.store_index = store_index;
            self.update_scalars()?;
        }
        Ok(())
    }

    pub(crate) fn region_count(&self) -> usize {
        self.scalars.len()
    }

    pub(crate) fn scalars(&self) -> &[f64] {
        &self.scalars
    }

    fn update_scalars(&mut self) -> Result<(), CharstringError> {
        let data = self
            .store
            .data
            .get(self.store_index as usize)
            .ok_or(CharstringError::InvalidVariationStoreIndex(self.store_index))?;
        self.scalars = data
            .region_indices
            .iter()
            .map(|ix| {
                self.store
                    .regions
                    .get(*ix as usize)
                    .map(|region| region.compute_scalar(self.coords))
                    .unwrap_or(0.0)
            })
            .collect();
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn scalars_at(coord: f32) -> Vec<f64> {
        let store = test_data::example_store();
        let coords = [F2Dot14::from_f32(coord)];
        BlendState::new(&store, &coords, 0)
            .unwrap()
            .scalars()
            .to_vec()
    }

    #[test]
    fn example_blends() {
        assert_eq!(scalars_at(-1.0), [1.0, 0.0]);
        assert_eq!(scalars_at(-0.5), [0.5, 1.0]);
        assert_eq!(scalars_at(-0.75), [0.75, 0.5]);
        assert_eq!(scalars_at(0.0), [0.0, 0.0]);
        assert_eq!(scalars_at(0.5), [0.0, 0.0]);
    }

    #[test]
    fn no_coords_is_default() {
        let store = test_data::example_store();
        let state = BlendState::new(&store, &[], 0).unwrap();
        assert_eq!(state.scalars(), [0.0, 0.0]);
    }

    #[test]
    fn invalid_store_index() {
        let store = test_data::example_store();
        assert!(matches!(
            BlendState::new(&store, &[], 1),
            Err(CharstringError::InvalidVariationStoreIndex(1))
        ));
    }
}
