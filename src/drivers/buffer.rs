use std::collections::VecDeque;
/// Integer mean of `values`, rounding half away from zero. `None` when empty.
pub fn rounded_mean(values: impl IntoIterator<Item = i64>) -> Option<i64> {
    let (sum, count) = values
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return None;
    }
    let quotient = sum / count;
    let remainder = sum % count;
    if 2 * remainder.abs() >= count {
        Some(quotient + sum.signum())
    } else {
        Some(quotient)
    }
}
/// Fixed-size history of the most recent readings, one slot every `stride` seconds.
///
/// The buffer always holds exactly `capacity()` values: it starts zero-filled and
/// every append evicts the oldest value.
#[derive(Clone, Debug)]
pub struct RollingBuffer {
    values: VecDeque<i64>,
    span_secs: u32,
    stride_secs: u32,
}
impl RollingBuffer {
    /// Buffer covering `span_secs` seconds with one slot per `stride_secs`.
    pub fn new(span_secs: u32, stride_secs: u32) -> Self {
        let stride_secs = stride_secs.max(1);
        let capacity = Self::slots(span_secs, stride_secs);
        Self {
            values: std::iter::repeat(0).take(capacity).collect(),
            span_secs,
            stride_secs,
        }
    }
    #[cfg(test)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity as u32, 1)
    }
    fn slots(span_secs: u32, stride_secs: u32) -> usize {
        (span_secs.div_ceil(stride_secs) as usize).max(1)
    }
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.values.len()
    }
    pub fn stride_secs(&self) -> u32 {
        self.stride_secs
    }
    pub fn span_secs(&self) -> u32 {
        self.span_secs
    }
    pub fn append(&mut self, value: i64) {
        self.values.pop_front();
        self.values.push_back(value);
    }
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
    }
    pub fn mean(&self) -> i64 {
        rounded_mean(self.values.iter().copied()).unwrap_or(0)
    }
    #[cfg(test)]
    pub fn latest(&self) -> i64 {
        self.values.back().copied().unwrap_or(0)
    }
    #[cfg(test)]
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        self.values.iter().copied()
    }
    /// `[seconds, value]` pairs, oldest first, with the newest value at x = 0.
    pub fn points(&self) -> Vec<[f64; 2]> {
        let last = self.values.len().saturating_sub(1);
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let x = -((last - i) as f64) * self.stride_secs as f64;
                [x, *v as f64]
            })
            .collect()
    }
}
