pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod interaction;
pub mod lock;
pub mod persisted;
pub mod persisted_store;
pub mod reconcile;
pub mod runtime;
pub mod status;

pub use channel::{decode_frame, FrameChannel, FrameSink, MemoryChannel, RoomChannel};
pub use config::{ConfigError, SessionConfig};
pub use engine::{MoveArbiter, SOLO_PARTICIPANT};
pub use error::{ChannelError, LockError, ReconcileError, SessionError, StorageError};
pub use gesture::{BoardView, DragRelease, GestureRelay, PeerGesture, SettleState};
pub use interaction::{InteractionMode, PointerEvent, PressDragRelease, SelectAndCommit};
pub use lock::{GrantOutcome, LockCoordinator, LockExpiry, LockState, LockTimeouts};
pub use persisted::{GalleryBlob, GALLERY_KEY, GALLERY_VERSION};
pub use persisted_store::{FileStore, GalleryStore, KeyValueStore, MemoryStore};
pub use reconcile::{OptimisticReconciler, PendingMove, Reconciliation};
pub use runtime::{SelectionView, SessionEvent, SessionHooks, SessionMode, SessionView};
pub use status::{Advisory, StatusLine};
