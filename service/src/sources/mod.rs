//! Lawmaker sources and the fetch lifecycle that serves all of them.
//!
//! Every source is described by data, not code: a [`SourceDescriptor`] names
//! the endpoint, the credential convention, where the record list sits in the
//! response, and which raw fields map onto [`LawmakerRecord`]. One
//! [`SourceFetchLifecycle`] implementation then serves any number of
//! differently-shaped sources.
//!
//! # Attempt flow
//!
//! 1. [`gate::can_fetch`] refuses sources whose required credential is absent
//! 2. one GET through a [`SourceTransport`]
//! 3. non-2xx status, non-JSON body, or a payload path that does not resolve
//!    to a list each end the attempt with the matching [`FetchError`]
//! 4. records missing a required field are dropped and counted
//!
//! # Testing
//!
//! ```ignore
//! use makenoise_api::sources::{mock::MockTransport, SourceDescriptor, SourceFetchLifecycle};
//!
//! let mock = Arc::new(MockTransport::new());
//! mock.push_json(&json!({"legislators": []}));
//!
//! let descriptor = SourceDescriptor::new("state", "https://example.gov/api", "legislators")?;
//! let state = SourceFetchLifecycle::new(Arc::new(descriptor), mock).run(None).await;
//! assert!(state.data().is_some_and(<[_]>::is_empty));
//! ```

mod descriptor;
pub mod gate;
mod lifecycle;
mod path;
mod record;
mod state;
mod transport;

pub use descriptor::{
    fill_template, CredentialPlacement, CredentialSpec, DescriptorError, FieldMap,
    FieldMapConfig, SourceConfig, SourceDescriptor,
};
pub use lifecycle::SourceFetchLifecycle;
pub use path::{PathError, PayloadPath, Segment};
pub use record::{normalize, normalize_all, LawmakerRecord, Normalized};
pub use state::{FetchError, FetchState};
pub use transport::{HttpTransport, PreparedRequest, RawResponse, SourceTransport, TransportError};

#[cfg(any(test, feature = "test-utils"))]
pub use transport::mock;
