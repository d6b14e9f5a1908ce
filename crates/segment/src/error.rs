use {crate::ElementType, std::fmt};

#[derive(Debug)]
pub enum SegmentError {
    ModelLoad(String),
    GraphBuild(String),
    DelegateLoad(String),
    /// Operation issued out of order; `state` names what the object was in.
    State {
        operation: &'static str,
        state: String,
    },
    Allocation(String),
    UnsupportedInputType(ElementType),
    UnsupportedOutputType(ElementType),
    InvalidShape(String),
    Invocation(String),
    ImageIo(String),
    Config(String),
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::ModelLoad(msg) => write!(f, "model load error: {msg}"),
            SegmentError::GraphBuild(msg) => write!(f, "graph build error: {msg}"),
            SegmentError::DelegateLoad(msg) => write!(f, "delegate load error: {msg}"),
            SegmentError::State { operation, state } => {
                write!(f, "state error: cannot {operation} while {state}")
            }
            SegmentError::Allocation(msg) => write!(f, "allocation error: {msg}"),
            SegmentError::UnsupportedInputType(ty) => {
                write!(f, "unsupported input tensor type: {ty}")
            }
            SegmentError::UnsupportedOutputType(ty) => {
                write!(f, "unsupported output tensor type: {ty}")
            }
            SegmentError::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
            SegmentError::Invocation(msg) => write!(f, "invocation error: {msg}"),
            SegmentError::ImageIo(msg) => write!(f, "image io error: {msg}"),
            SegmentError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for SegmentError {}

impl From<frame::FrameError> for SegmentError {
    fn from(err: frame::FrameError) -> Self {
        SegmentError::ImageIo(err.to_string())
    }
}

impl From<base::ShapeError> for SegmentError {
    fn from(err: base::ShapeError) -> Self {
        SegmentError::InvalidShape(err.to_string())
    }
}
