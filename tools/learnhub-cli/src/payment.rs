//! Terminal payment window.

use dialoguer::Confirm;
use learnhub_store::{CheckoutSdk, PaymentCallback, PaymentRequest};

use crate::output::Output;

/// A [`CheckoutSdk`] that asks for confirmation on the terminal.
///
/// Stands in for a hosted payment page: confirming settles the payment with
/// a locally generated reference for the order. The prompt runs on the
/// blocking pool. Under `--json` there is no prompt, so the payment is
/// declined unless `--yes` was given.
#[derive(Clone)]
pub struct ConsoleCheckout {
    output: Output,
    assume_yes: bool,
}

impl ConsoleCheckout {
    pub fn new(output: Output, assume_yes: bool) -> Self {
        Self { output, assume_yes }
    }
}

impl CheckoutSdk for ConsoleCheckout {
    fn open(&self, request: PaymentRequest, callback: PaymentCallback) {
        self.output.header("Payment");
        self.output.kv("Order", request.order_id.as_str());
        self.output.kv("Amount", &request.amount.display());
        self.output.kv("For", &request.description);

        let reference = payment_reference(&request);
        if self.assume_yes {
            callback.on_success(reference, None);
            return;
        }
        if self.output.is_json() {
            callback.on_failure("payment needs confirmation; pass --yes with --json");
            return;
        }

        let prompt = format!("Pay {}?", request.amount.display());
        tokio::task::spawn_blocking(move || {
            match Confirm::new().with_prompt(prompt).default(false).interact() {
                Ok(true) => callback.on_success(reference, None),
                Ok(false) => callback.on_failure("payment cancelled"),
                Err(e) => callback.on_failure(format!("payment prompt failed: {e}")),
            }
        });
    }
}

fn payment_reference(request: &PaymentRequest) -> String {
    format!("pay_console_{}", request.order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnhub_commerce::{Currency, Money, OrderId, UserId};
    use learnhub_store::{PaymentFailure, PaymentInitiator, SdkPaymentInitiator};

    fn request() -> PaymentRequest {
        PaymentRequest {
            order_id: OrderId::new("order_7"),
            amount: Money::new(49_900, Currency::INR),
            description: "1 course".into(),
            customer: UserId::new("u1"),
        }
    }

    #[tokio::test]
    async fn test_assume_yes_approves_without_prompt() {
        let initiator =
            SdkPaymentInitiator::new(ConsoleCheckout::new(Output::new(false, true), true));
        let confirmation = initiator.initiate(request()).await.unwrap();

        assert_eq!(confirmation.payment_ref.as_str(), "pay_console_order_7");
    }
    #[tokio::test]
    async fn test_json_mode_without_yes_declines_instead_of_prompting() {
        let initiator =
            SdkPaymentInitiator::new(ConsoleCheckout::new(Output::new(false, true), false));

        let err = initiator.initiate(request()).await.unwrap_err();

        match err {
            PaymentFailure::Declined(reason) => assert!(reason.contains("--yes"), "{reason}"),
            other => panic!("expected a decline, got {other:?}"),
        }
    }
}
