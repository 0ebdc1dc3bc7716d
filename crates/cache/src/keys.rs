//! Cache key scheme.

use std::time::Duration;

use common::ProductId;

/// How long a cached product stays valid.
pub const PRODUCT_TTL: Duration = Duration::from_secs(30 * 60);

const PRODUCT_PREFIX: &str = "product";

/// Key holding the cached response for one product: `product:<id>`.
pub fn product_key(id: ProductId) -> String {
    format!("{PRODUCT_PREFIX}:{id}")
}
