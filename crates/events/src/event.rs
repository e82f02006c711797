/// Something that happened and is kept as history.
///
/// An event carries only what happened (who read which message). Its place
/// in history is assigned by the [`AppendOnlyLog`](crate::AppendOnlyLog) it
/// is appended to.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name of the event, `<boundary>.<subject>.<verb>`.
    fn event_type(&self) -> &'static str;

    /// Payload shape version; bump when fields change.
    fn version(&self) -> u32 {
        1
    }
}
