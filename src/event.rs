use crate::chat::resolver::ResolveError;

#[derive(Debug, Clone)]
pub enum AppEvent {
    ResponseFinished {
        request_id: u64,
        result: Result<String, ResolveError>,
    },
}
