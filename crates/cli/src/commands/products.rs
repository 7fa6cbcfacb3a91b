//! Catalog listing command.

use epcc_storefront::session::SessionError;

use super::Shop;

/// Print every catalog product with its price and image link.
#[allow(clippy::print_stdout)]
pub async fn list(shop: &Shop) -> Result<(), SessionError> {
    let listing = shop.products();
    listing.load().await?;

    let snapshot = listing.snapshot().await;
    if snapshot.products.is_empty() {
        println!("No products found");
        return Ok(());
    }

    for product in snapshot.products {
        println!(
            "{}  {}  {}",
            product.id,
            product.name,
            product.price.as_deref().unwrap_or("-")
        );
        if let Some(url) = product.image_url {
            println!("    image: {url}");
        }
    }
    Ok(())
}
