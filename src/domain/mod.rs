//! Domain layer
//!
//! Pure domain types with no I/O: the CA registry, the tenant directory and
//! the signing requests tenants submit. Everything here is either immutable
//! after startup or scoped to a single request.
//!
//! ## Module Organization
//!
//! - `id`: Type-safe identifiers with the NewType pattern
//! - `authority`: Certificate authorities, authority references, the registry
//! - `tenant`: Tenants, hashed secrets, the directory
//! - `csr`: Parsed certificate signing requests

pub mod authority;
pub mod csr;
pub mod id;
pub mod tenant;

pub use authority::{AuthorityRef, CaRegistry, CertificateAuthority};
pub use csr::{CsrError, SigningRequest};
pub use id::{CaName, CertificateHandle, TenantId};
pub use tenant::{SecretDigest, Tenant, TenantDirectory};
