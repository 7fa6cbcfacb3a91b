//! Cart commands.

use epcc_storefront::session::{CartSession, SessionError};
use epcc_storefront_core::{CartItemId, ProductId};

use super::Shop;

/// Print the cart, creating it if none exists yet.
pub async fn show(shop: &Shop) -> Result<(), SessionError> {
    let cart = shop.cart();
    cart.refresh().await?;
    print_cart(&cart).await;
    Ok(())
}

/// Add a product, creating the cart first if needed.
pub async fn add(shop: &Shop, product: String, quantity: u32) -> Result<(), SessionError> {
    let cart = shop.cart();
    cart.ensure_cart().await?;
    cart.add_item(ProductId::new(product), quantity).await?;

    if let Some(product) = cart.snapshot().await.last_added_product {
        tracing::info!(product_id = %product, "Added to cart");
    }
    print_cart(&cart).await;
    Ok(())
}

/// Set an item's quantity; zero or less removes it.
pub async fn set(shop: &Shop, item: String, quantity: i64) -> Result<(), SessionError> {
    let cart = shop.cart();
    cart.set_quantity(CartItemId::new(item), quantity).await?;
    print_cart(&cart).await;
    Ok(())
}

/// Remove an item.
pub async fn remove(shop: &Shop, item: String) -> Result<(), SessionError> {
    let cart = shop.cart();
    cart.remove_item(CartItemId::new(item)).await?;
    print_cart(&cart).await;
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn print_cart(cart: &CartSession) {
    let snapshot = cart.snapshot().await;

    if let Some(cart) = &snapshot.cart {
        println!("Cart {}", cart.id);
    }
    if snapshot.items.is_empty() {
        println!("  (empty)");
    }
    for item in &snapshot.items {
        println!(
            "  {}  {} x{}  {}",
            item.id,
            item.name,
            item.quantity,
            item.line_price().as_deref().unwrap_or("-")
        );
    }
    println!(
        "{} item(s), total {}",
        snapshot.item_count, snapshot.total_amount
    );
}
