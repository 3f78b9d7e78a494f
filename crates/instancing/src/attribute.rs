/// Index of an attribute inside its [`crate::InstanceBuffers`], in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeId(pub usize);

/// Upload frequency hint forwarded to the GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUsage {
    #[default]
    Static,
    Dynamic,
}

/// Declaration of one attribute.
#[derive(Debug, Clone)]
pub struct AttributeDesc {
    /// Name used by shaders and lookups, e.g. `"a_position"`.
    pub name: &'static str,
    /// Components per element (3 for a vec3; 4 for a mat4 when `matrix` is set).
    pub size: usize,
    /// Initial element capacity.
    pub capacity: usize,
    pub usage: AttributeUsage,
    /// Square matrix of `size` x `size` components per element.
    pub matrix: bool,
    /// Shared geometry: never slotted, never resized per instance.
    pub fixed: bool,
    /// Initial mirror contents. For fixed attributes this is the geometry itself.
    pub default_data: Option<Vec<f32>>,
}

impl AttributeDesc {
    /// A per-instance attribute with `size` components.
    pub fn instanced(name: &'static str, size: usize, capacity: usize) -> Self {
        Self {
            name,
            size,
            capacity,
            usage: AttributeUsage::Static,
            matrix: false,
            fixed: false,
            default_data: None,
        }
    }

    /// Shared, non-instanced geometry data.
    pub fn fixed(name: &'static str, size: usize, data: Vec<f32>) -> Self {
        Self {
            name,
            size,
            capacity: data.len() / size.max(1),
            usage: AttributeUsage::Static,
            matrix: false,
            fixed: true,
            default_data: Some(data),
        }
    }

    pub fn dynamic(mut self) -> Self {
        self.usage = AttributeUsage::Dynamic;
        self
    }

    pub fn matrix(mut self) -> Self {
        self.matrix = true;
        self
    }

    /// Floats per element.
    pub fn stride(&self) -> usize {
        if self.matrix {
            self.size * self.size
        } else {
            self.size
        }
    }
}

/// One attribute's CPU mirror plus its upload state.
#[derive(Debug, Clone)]
pub struct Attribute {
    desc: AttributeDesc,
    data: Vec<f32>,
    pub(crate) dirty: bool,
    pub(crate) resized: bool,
}

impl Attribute {
    pub(crate) fn new(mut desc: AttributeDesc) -> Self {
        let data = match desc.default_data.take() {
            Some(data) => data,
            None => vec![0.0; desc.capacity * desc.stride()],
        };
        Self {
            desc,
            data,
            dirty: false,
            resized: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    pub fn size(&self) -> usize {
        self.desc.size
    }

    pub fn stride(&self) -> usize {
        self.desc.stride()
    }

    pub fn usage(&self) -> AttributeUsage {
        self.desc.usage
    }

    pub fn is_fixed(&self) -> bool {
        self.desc.fixed
    }

    pub fn is_matrix(&self) -> bool {
        self.desc.matrix
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_resized(&self) -> bool {
        self.resized
    }

    /// Element capacity of the mirror.
    pub fn capacity(&self) -> usize {
        self.data.len() / self.stride().max(1)
    }

    /// The whole mirror, as uploaded.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut Vec<f32> {
        &mut self.data
    }

    /// Double the mirror until `required` floats fit. Returns true if it grew.
    pub(crate) fn ensure_len(&mut self, required: usize) -> bool {
        if required <= self.data.len() {
            return false;
        }
        let mut len = self.data.len().max(self.stride());
        while len < required {
            len *= 2;
        }
        let old_capacity = self.capacity();
        self.data.resize(len, 0.0);
        self.resized = true;
        tracing::debug!(
            attribute = self.desc.name,
            old_capacity,
            new_capacity = self.capacity(),
            "attribute mirror grew"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_stride_is_squared() {
        let desc = AttributeDesc::instanced("a_rotation", 4, 8).matrix();
        assert_eq!(desc.stride(), 16);
        let attr = Attribute::new(desc);
        assert_eq!(attr.data().len(), 8 * 16);
        assert_eq!(attr.capacity(), 8);
    }

    #[test]
    fn fixed_attribute_uses_default_data() {
        let attr = Attribute::new(AttributeDesc::fixed("a_surface", 3, vec![1.0; 24]));
        assert!(attr.is_fixed());
        assert_eq!(attr.capacity(), 8);
        assert_eq!(attr.data()[0], 1.0);
    }

    #[test]
    fn growth_doubles_and_flags_resize() {
        let mut attr = Attribute::new(AttributeDesc::instanced("a_size", 1, 2));
        assert!(!attr.ensure_len(2));
        assert!(attr.ensure_len(3));
        assert_eq!(attr.capacity(), 4);
        assert!(attr.is_resized());
    }

    #[test]
    fn growth_from_zero_capacity() {
        let mut attr = Attribute::new(AttributeDesc::instanced("a_color", 4, 0));
        assert!(attr.ensure_len(4));
        assert_eq!(attr.capacity(), 1);
    }
}
