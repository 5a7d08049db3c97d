/// Security module: MAC primitives, canonical request form, signed links
pub mod canonical;
pub mod hmac;
pub mod signed_url;

pub use canonical::{
    canonical_query, canonical_request, split_path_and_query, QueryParams,
    EXPIRY_PARAM, SIGNATURE_PARAM,
};
pub use hmac::{
    constant_time_eq,
    construct_callback_payload,
    create_signature,
    generate_secret,
    validate_timestamp,
    verify_signature,
    TIMESTAMP_TOLERANCE,
};
pub use signed_url::{
    unix_now, SecretKey, SignError, SignedUrl, UrlSigner, DEFAULT_LIFETIME_SECS,
};
