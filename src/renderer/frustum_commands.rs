use crate::renderer::pass::Pass;

/// One depth slice of the view volume and the commands binned into it.
///
/// Descriptors are reused by index across frames; bins keep their capacity
/// and are emptied before every binning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrustumCommands {
    pub near: f64,
    pub far: f64,
    bins: [Vec<u32>; Pass::BINNED_COUNT],
}

impl FrustumCommands {
    #[must_use]
    pub fn new(near: f64, far: f64) -> Self {
        Self {
            near,
            far,
            bins: Default::default(),
        }
    }

    /// Empties every bin without releasing storage.
    pub fn clear(&mut self) {
        for bin in &mut self.bins {
            bin.clear();
        }
    }

    /// Appends command `index` to the bin of `pass`. Out-of-band passes are
    /// ignored.
    pub fn push(&mut self, pass: Pass, index: u32) {
        if let Some(bin) = pass.bin_index() {
            self.bins[bin].push(index);
        }
    }

    /// Command indices binned for `pass`, in submission order.
    #[must_use]
    pub fn commands(&self, pass: Pass) -> &[u32] {
        pass.bin_index().map_or(&[], |bin| self.bins[bin].as_slice())
    }

    #[must_use]
    pub fn count(&self, pass: Pass) -> usize {
        self.commands(pass).len()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    #[inline]
    #[must_use]
    pub fn overlaps(&self, start: f64, stop: f64) -> bool {
        start <= self.far && stop >= self.near
    }
}
