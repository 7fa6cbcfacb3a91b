//! Checkout command.

use clap::Args;
use thiserror::Error;

use epcc_storefront::session::SessionError;
use epcc_storefront_core::{Address, CheckoutRequest, Email, EmailError};

use super::Shop;

/// Errors raised before the checkout is submitted.
#[derive(Debug, Error)]
pub enum CheckoutCommandError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Name must include a first and last name")]
    IncompleteName,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Customer and address details. The order ships to the billing address.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Customer full name ("First Last")
    #[arg(long)]
    name: String,

    /// Customer email
    #[arg(long)]
    email: String,

    /// Street address
    #[arg(long)]
    line1: String,

    /// Second address line
    #[arg(long)]
    line2: Option<String>,

    #[arg(long)]
    city: String,

    #[arg(long)]
    postcode: String,

    #[arg(long)]
    county: Option<String>,

    /// Two-letter country code
    #[arg(long)]
    country: String,

    #[arg(long)]
    phone: Option<String>,

    /// Pay through the manual gateway after the order is created
    #[arg(long)]
    pay: bool,
}

impl CheckoutArgs {
    fn into_request(self) -> Result<CheckoutRequest, CheckoutCommandError> {
        let email = Email::parse(&self.email)?;
        let (first_name, last_name) = split_name(&self.name)?;

        let address = Address {
            first_name,
            last_name,
            phone_number: self.phone,
            line_1: self.line1,
            line_2: self.line2,
            city: self.city,
            county: self.county,
            postcode: self.postcode,
            country: self.country.to_ascii_uppercase(),
            ..Address::default()
        };
        Ok(CheckoutRequest::shipping_to_billing(email, address))
    }
}

fn split_name(name: &str) -> Result<(String, String), CheckoutCommandError> {
    let name = name.trim();
    let (first, last) = name
        .rsplit_once(char::is_whitespace)
        .ok_or(CheckoutCommandError::IncompleteName)?;
    Ok((first.trim().to_string(), last.trim().to_string()))
}

/// Place the order and print its ID.
#[allow(clippy::print_stdout)]
pub async fn submit(shop: &Shop, args: CheckoutArgs) -> Result<(), CheckoutCommandError> {
    let pay = args.pay;
    let request = args.into_request()?;

    let checkout = if pay {
        shop.checkout_with_payment()
    } else {
        shop.checkout()
    };
    let completed = checkout.submit(request).await?;

    let order = &completed.order;
    if let Some(id) = &order.id {
        println!("Order {id} placed");
    }
    if let Some(total) = order.total_with_tax() {
        println!("  total: {total}");
    }
    match &completed.payment_transaction {
        Some(transaction) => println!("  paid: transaction {}", transaction.id),
        None => println!("  payment: {:?}", order.payment),
    }
    Ok(())
}
