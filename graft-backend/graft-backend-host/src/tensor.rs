use graft_core::{Device, GraftError, Result, Tensor};

#[derive(Clone, Debug, PartialEq)]
pub struct HostTensor {
    pub(crate) data: Vec<f32>,
    pub(crate) shape: Vec<usize>,
    pub(crate) device: Device,
}

impl HostTensor {
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(GraftError::ShapeMismatch {
                expected: shape,
                got: vec![data.len()],
            });
        }
        Ok(Self {
            data,
            shape,
            device: Device::Host,
        })
    }

    /// Relabel the placement tag without moving data.
    ///
    /// Lets tests hand the backend an array that claims to live elsewhere.
    #[must_use]
    pub fn on_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

impl Tensor for HostTensor {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn device(&self) -> Device {
        self.device
    }
}
