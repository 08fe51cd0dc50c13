use anyhow::Result;
use jobcache_core::utils::{format_date, format_zar};

use super::{PaymentCommand, SubscriptionCommand};
use crate::context::AppContext;
use crate::output::{field, print_json};

pub async fn payment(ctx: &AppContext, action: PaymentCommand) -> Result<()> {
    let api = ctx.api()?;
    match action {
        PaymentCommand::Config => {
            let config = api.payment_config().await?;
            if ctx.json {
                return print_json(&config);
            }
            field("Public key", config.paystack_public_key.as_deref());
            field("Currency", Some(config.currency.as_deref().unwrap_or("ZAR")));
        }
        PaymentCommand::Init { plan } => {
            let init = api.initialize_payment(plan).await?;
            if ctx.json {
                return print_json(&init);
            }
            if !init.is_success() {
                anyhow::bail!(
                    "{}",
                    init.message.as_deref().unwrap_or("Payment initialization failed")
                );
            }
            let amount = init.amount.map(format_zar);
            field("Plan", Some(plan.to_string().as_str()));
            field("Amount", amount.as_deref());
            field("Reference", init.reference.as_deref());
            println!("Complete the payment, then run `jobcache payment verify <reference>`");
        }
        PaymentCommand::Verify { reference } => {
            let verification = api.verify_payment(&reference).await?;
            if ctx.json {
                return print_json(&verification);
            }
            if !verification.is_success() {
                anyhow::bail!("Payment verification failed");
            }
            println!("Payment verified. Premium features are active.");
        }
    }
    Ok(())
}

pub async fn subscription(ctx: &AppContext, action: SubscriptionCommand) -> Result<()> {
    let api = ctx.api()?;
    match action {
        SubscriptionCommand::Status => {
            let status = api.subscription_status().await?;
            if ctx.json {
                return print_json(&status);
            }
            let days = status.days_remaining.map(|d| d.to_string());
            let since = status.subscription_date.as_deref().map(format_date);
            field("Plan", status.subscription.as_deref());
            field("Active", Some(if status.is_active { "yes" } else { "no" }));
            field("Days left", days.as_deref());
            field("Since", since.as_deref());
        }
        SubscriptionCommand::Cancel => {
            let ack = api.cancel_subscription().await?;
            println!(
                "{}",
                ack.message.as_deref().unwrap_or("Subscription cancelled")
            );
        }
    }
    Ok(())
}
