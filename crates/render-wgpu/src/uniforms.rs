use cubetext_render::{UniformDesc, UniformKind, UniformValue};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformSlot {
    pub name: &'static str,
    pub kind: UniformKind,
    pub offset: u64,
}

/// Byte layout of a program's uniform block (std140-style alignment).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformLayout {
    slots: Vec<UniformSlot>,
    size: u64,
}

fn align_to(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

fn align_and_size(kind: UniformKind) -> (u64, u64) {
    match kind {
        UniformKind::Mat4 => (16, 64),
        UniformKind::Bool => (4, 4),
    }
}

impl UniformLayout {
    pub fn new(descs: &[UniformDesc]) -> Self {
        let mut offset = 0;
        let mut slots = Vec::with_capacity(descs.len());
        for desc in descs {
            let (align, size) = align_and_size(desc.kind);
            offset = align_to(offset, align);
            slots.push(UniformSlot {
                name: desc.name,
                kind: desc.kind,
                offset,
            });
            offset += size;
        }
        Self {
            slots,
            size: align_to(offset.max(16), 16),
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|s| s.name == name)
    }
}

pub(crate) fn encode(value: UniformValue) -> Vec<u8> {
    match value {
        UniformValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
        UniformValue::Bool(b) => u32::from(b).to_le_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    fn cube_uniforms() -> Vec<UniformDesc> {
        vec![
            UniformDesc {
                name: "transform",
                kind: UniformKind::Mat4,
            },
            UniformDesc {
                name: "is_picking",
                kind: UniformKind::Bool,
            },
        ]
    }

    #[test]
    fn cube_block_is_eighty_bytes() {
        let layout = UniformLayout::new(&cube_uniforms());
        assert_eq!(layout.slot("transform").unwrap().offset, 0);
        assert_eq!(layout.slot("is_picking").unwrap().offset, 64);
        assert_eq!(layout.size(), 80);
    }

    #[test]
    fn matrix_after_bool_is_realigned() {
        let mut descs = cube_uniforms();
        descs.reverse();
        let layout = UniformLayout::new(&descs);
        assert_eq!(layout.slot("transform").unwrap().offset, 16);
        assert_eq!(layout.size(), 80);
    }

    #[test]
    fn empty_block_still_has_size() {
        assert_eq!(UniformLayout::new(&[]).size(), 16);
    }

    #[test]
    fn encoded_sizes() {
        assert_eq!(encode(UniformValue::Mat4(Mat4::IDENTITY)).len(), 64);
        assert_eq!(encode(UniformValue::Bool(true)), vec![1, 0, 0, 0]);
    }
}
