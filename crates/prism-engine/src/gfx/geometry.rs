use super::ResourceId;

/// Float vertex attribute layout: one tightly packed attribute per buffer.
///
/// `dims` is the component count per vertex (1..=4); stride is `dims * 4` bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    pub buffer: ResourceId,
    pub attribute: u32,
    pub dims: u32,
}

impl VertexLayout {
    pub const MAX_DIMS: u32 = 4;

    pub fn stride(&self) -> u64 {
        u64::from(self.dims) * std::mem::size_of::<f32>() as u64
    }

    /// Whole vertices this layout reads from a buffer of `floats` values.
    pub fn vertices_in(&self, floats: usize) -> u32 {
        match self.dims {
            0 => 0,
            d => u32::try_from(floats / d as usize).unwrap_or(u32::MAX),
        }
    }
}

fn check_dims(dims: u32) -> anyhow::Result<()> {
    anyhow::ensure!(
        (1..=VertexLayout::MAX_DIMS).contains(&dims),
        "vertex dims must be in 1..={}, got {dims}",
        VertexLayout::MAX_DIMS
    );
    Ok(())
}

/// Checks the shape of a static vertex upload.
pub(crate) fn check_upload(data: &[f32], dims: u32) -> anyhow::Result<u32> {
    check_dims(dims)?;
    anyhow::ensure!(!data.is_empty(), "vertex data is empty");
    anyhow::ensure!(
        data.len() % dims as usize == 0,
        "vertex data length {} is not a multiple of dims {dims}",
        data.len()
    );
    Ok((data.len() / dims as usize) as u32)
}

/// Checks that a layout of `dims` floats per vertex fits a buffer holding
/// `floats` values. Shared by every context so layout binds behave the same.
pub(crate) fn check_layout(floats: usize, dims: u32) -> anyhow::Result<()> {
    check_dims(dims)?;
    anyhow::ensure!(
        floats % dims as usize == 0,
        "stride of {dims} floats does not divide a buffer of {floats} floats"
    );
    Ok(())
}
