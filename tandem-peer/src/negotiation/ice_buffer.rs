use tandem_core::IceCandidate;

/// Кандидаты, пришедшие раньше удалённого описания. Порядок поступления
/// сохраняется.
#[derive(Debug, Default)]
pub struct IceCandidateBuffer {
    pending: Vec<IceCandidate>,
}

impl IceCandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.pending.push(candidate);
    }

    /// Returns everything buffered, oldest first, and leaves the buffer empty.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
