use bo_common::Cents;

use crate::StorefrontApiError;

/// Storefronts express prices as decimal strings, e.g. `"199.99"`.
pub fn parse_storefront_price(price: &str) -> Result<Cents, StorefrontApiError> {
    price.parse::<Cents>().map_err(|e| StorefrontApiError::InvalidCurrencyAmount(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prices() {
        assert_eq!(parse_storefront_price("199.99").unwrap(), Cents::from(19999));
        assert_eq!(parse_storefront_price("139.99").unwrap(), Cents::from(13999));
        assert!(matches!(parse_storefront_price("n/a"), Err(StorefrontApiError::InvalidCurrencyAmount(_))));
    }
}
