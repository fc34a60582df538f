use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StudioError, StudioResult},
    models::{Appointment, AppointmentStatus, OrderType, User},
};

pub const CUSTOM_TIME_SLOT: &str = "TBD";
pub const CUSTOM_TITLE: &str = "Custom design (in progress)";
pub const CUSTOM_NOTES: &str = "Custom design order";

impl AppointmentStatus {
    pub fn can_advance_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Open, Pending)
                | (Pending, Open)
                | (Pending, WaitingPayment)
                | (WaitingPayment, Signing)
                | (Signing, Signed)
                | (Signed, Booked)
                | (Booked, Completed)
        )
    }
}

pub fn valid_initial_status(order_type: OrderType, status: AppointmentStatus) -> bool {
    match order_type {
        OrderType::Claimed => matches!(status, AppointmentStatus::Open | AppointmentStatus::Pending),
        OrderType::Custom => status == AppointmentStatus::WaitingPayment,
    }
}

/// `from` is `None` for a new appointment. The admin override skips every check.
pub fn check_transition(
    from: Option<AppointmentStatus>,
    to: AppointmentStatus,
    order_type: OrderType,
    admin_override: bool,
) -> StudioResult<()> {
    if admin_override {
        return Ok(());
    }
    match from {
        None if valid_initial_status(order_type, to) => Ok(()),
        None => Err(StudioError::Validation(format!(
            "New {} appointments cannot start as {}",
            order_type_label(order_type),
            to
        ))),
        Some(from) if from.can_advance_to(to) => Ok(()),
        Some(from) => Err(StudioError::IllegalTransition { from, to }),
    }
}

fn order_type_label(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Claimed => "claimed",
        OrderType::Custom => "custom",
    }
}

/// Admin workflow buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    ConfirmDeposit,
    ConfirmPayment,
    PromoteSigned,
    ConfirmBooking,
    Complete,
}

impl WorkflowStep {
    pub fn from_status(self) -> AppointmentStatus {
        match self {
            WorkflowStep::ConfirmDeposit => AppointmentStatus::Pending,
            WorkflowStep::ConfirmPayment => AppointmentStatus::WaitingPayment,
            WorkflowStep::PromoteSigned => AppointmentStatus::Signing,
            WorkflowStep::ConfirmBooking => AppointmentStatus::Signed,
            WorkflowStep::Complete => AppointmentStatus::Booked,
        }
    }

    pub fn to_status(self) -> AppointmentStatus {
        match self {
            WorkflowStep::ConfirmDeposit => AppointmentStatus::WaitingPayment,
            WorkflowStep::ConfirmPayment => AppointmentStatus::Signing,
            WorkflowStep::PromoteSigned => AppointmentStatus::Signed,
            WorkflowStep::ConfirmBooking => AppointmentStatus::Booked,
            WorkflowStep::Complete => AppointmentStatus::Completed,
        }
    }

    pub fn activity_kind(self) -> &'static str {
        match self {
            WorkflowStep::ConfirmDeposit => "deposit_confirmed",
            WorkflowStep::ConfirmPayment => "payment_received",
            WorkflowStep::PromoteSigned => "consent_signed",
            WorkflowStep::ConfirmBooking => "booking_confirmed",
            WorkflowStep::Complete => "appointment_completed",
        }
    }

    /// Checks the step against the appointment and returns the status to store.
    pub fn apply(self, appointment: &Appointment) -> StudioResult<AppointmentStatus> {
        if appointment.status != self.from_status() {
            return Err(StudioError::IllegalTransition {
                from: appointment.status,
                to: self.to_status(),
            });
        }
        if self == WorkflowStep::PromoteSigned && !appointment.is_signed() {
            return Err(StudioError::Validation(
                "Consent form has not been signed yet".to_string(),
            ));
        }
        Ok(self.to_status())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOrderInput {
    pub user_id: String,
    pub total_price: Option<i64>,
    pub deposit_paid: Option<i64>,
    pub notes: Option<String>,
}

pub fn new_custom_order(input: &CustomOrderInput, customer: &User) -> StudioResult<Appointment> {
    let total_price = input
        .total_price
        .filter(|value| *value > 0)
        .ok_or(StudioError::MissingField("totalPrice"))?;
    let deposit_paid = input
        .deposit_paid
        .filter(|value| *value > 0)
        .ok_or(StudioError::MissingField("depositPaid"))?;
    if deposit_paid > total_price {
        return Err(StudioError::Validation(
            "Deposit cannot exceed the total price".to_string(),
        ));
    }

    let now = Utc::now();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let notes = input
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|notes| !notes.is_empty())
        .unwrap_or(CUSTOM_NOTES);

    Ok(Appointment {
        id: format!("custom_{}_{}", now.timestamp_millis(), &suffix[..9]),
        date: now.format("%Y-%m-%d").to_string(),
        time_slot: CUSTOM_TIME_SLOT.to_string(),
        user_id: Some(customer.id.clone()),
        customer_name: Some(customer.name.clone()),
        phone_number: customer.phone_number.clone(),
        status: AppointmentStatus::WaitingPayment,
        notes: Some(notes.to_string()),
        artwork_id: None,
        artwork_title: Some(CUSTOM_TITLE.to_string()),
        artwork_image: None,
        total_price: Some(total_price),
        deposit_paid: Some(deposit_paid),
        tattoo_position: None,
        tattoo_size: None,
        tattoo_color: None,
        consent_notes: None,
        signature_data: None,
        signed_at: None,
        signer_name: None,
        signer_phone: None,
        order_type: OrderType::Custom,
        created_at: now.to_rfc3339(),
    })
}

pub fn deposit_message(appointment: &Appointment) -> String {
    let amount = appointment.deposit_paid.unwrap_or(0);
    format!(
        "Hello, the deposit for this tattoo is {amount}.\n\n\
         ___ Deposit policy ___\n\n\
         Transferring the deposit confirms the booking. Deposits are non-refundable.\n\n\
         - Portfolio designs must be tattooed within 3 months\n\
         - Custom designs must be tattooed within 3 months of the finished drawing\n\
         - Deposits are forfeited when the session is not completed in time"
    )
}

pub fn consent_link(appointment: &Appointment, origin: &str) -> String {
    format!("{}/#/consent/{}", origin.trim_end_matches('/'), appointment.id)
}

pub fn consent_message(appointment: &Appointment, origin: &str) -> String {
    format!(
        "Hello, we have received your deposit. Below is the consent form for this tattoo.\n\n\
         Please review it, sign online and submit. Thank you!\n\n{}",
        consent_link(appointment, origin)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use rstest::rstest;
    use AppointmentStatus::*;

    fn appointment(status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "p1".into(),
            date: "2026-10-20".into(),
            time_slot: "14:00".into(),
            user_id: Some("u1".into()),
            customer_name: Some("Alice".into()),
            phone_number: None,
            status,
            notes: None,
            artwork_id: Some("a1".into()),
            artwork_title: None,
            artwork_image: None,
            total_price: Some(5000),
            deposit_paid: Some(1000),
            tattoo_position: None,
            tattoo_size: None,
            tattoo_color: None,
            consent_notes: None,
            signature_data: None,
            signed_at: None,
            signer_name: None,
            signer_phone: None,
            order_type: OrderType::Claimed,
            created_at: "2026-10-18T00:00:00Z".into(),
        }
    }

    #[rstest]
    #[case(Open, Pending, true)]
    #[case(Pending, Open, true)]
    #[case(Pending, WaitingPayment, true)]
    #[case(WaitingPayment, Signing, true)]
    #[case(Signing, Signed, true)]
    #[case(Signed, Booked, true)]
    #[case(Booked, Completed, true)]
    #[case(Booked, Booked, true)]
    #[case(Open, Booked, false)]
    #[case(Pending, Signed, false)]
    #[case(Completed, Open, false)]
    #[case(Signed, Signing, false)]
    fn transition_table(
        #[case] from: AppointmentStatus,
        #[case] to: AppointmentStatus,
        #[case] legal: bool,
    ) {
        assert_eq!(from.can_advance_to(to), legal);
        assert_eq!(check_transition(Some(from), to, OrderType::Claimed, false).is_ok(), legal);
    }

    #[test]
    fn override_allows_any_jump() {
        for from in AppointmentStatus::ALL {
            for to in AppointmentStatus::ALL {
                assert!(check_transition(Some(from), to, OrderType::Claimed, true).is_ok());
            }
        }
    }

    #[test]
    fn custom_orders_start_waiting_for_payment() {
        assert!(check_transition(None, WaitingPayment, OrderType::Custom, false).is_ok());
        assert!(check_transition(None, Pending, OrderType::Custom, false).is_err());
        assert!(check_transition(None, Pending, OrderType::Claimed, false).is_ok());
        assert!(check_transition(None, Booked, OrderType::Claimed, false).is_err());
    }

    #[test]
    fn steps_require_their_source_status() {
        let pending = appointment(Pending);
        assert_eq!(WorkflowStep::ConfirmDeposit.apply(&pending).unwrap(), WaitingPayment);
        assert!(matches!(
            WorkflowStep::Complete.apply(&pending),
            Err(StudioError::IllegalTransition { from: Pending, to: Completed })
        ));
    }

    #[test]
    fn promotion_requires_a_signature() {
        let mut signing = appointment(Signing);
        assert!(WorkflowStep::PromoteSigned.apply(&signing).is_err());
        signing.signed_at = Some("2026-10-18 10:00:00".into());
        assert_eq!(WorkflowStep::PromoteSigned.apply(&signing).unwrap(), Signed);
    }

    #[test]
    fn custom_order_copies_customer() {
        let customer = User {
            id: "line-7".into(),
            name: "Ken".into(),
            avatar_url: None,
            role: Role::Member,
            favorites: vec![],
            phone_number: Some("0912000000".into()),
            last_login: None,
        };
        let input = CustomOrderInput {
            user_id: "line-7".into(),
            total_price: Some(8000),
            deposit_paid: Some(2000),
            notes: None,
        };
        let order = new_custom_order(&input, &customer).unwrap();
        assert!(order.id.starts_with("custom_"));
        assert_eq!(order.status, WaitingPayment);
        assert_eq!(order.order_type, OrderType::Custom);
        assert_eq!(order.time_slot, CUSTOM_TIME_SLOT);
        assert_eq!(order.customer_name.as_deref(), Some("Ken"));
        assert_eq!(order.notes.as_deref(), Some(CUSTOM_NOTES));
        assert!(order.artwork_id.is_none());
    }

    #[test]
    fn custom_order_needs_both_amounts() {
        let customer = User {
            id: "line-7".into(),
            name: "Ken".into(),
            avatar_url: None,
            role: Role::Member,
            favorites: vec![],
            phone_number: None,
            last_login: None,
        };
        let input = CustomOrderInput {
            user_id: "line-7".into(),
            total_price: Some(8000),
            deposit_paid: None,
            notes: None,
        };
        assert!(matches!(
            new_custom_order(&input, &customer),
            Err(StudioError::MissingField("depositPaid"))
        ));
    }

    #[test]
    fn messages_carry_amount_and_link() {
        let apt = appointment(WaitingPayment);
        assert!(deposit_message(&apt).contains("deposit for this tattoo is 1000"));
        let message = consent_message(&apt, "https://ink.example/");
        assert!(message.ends_with("https://ink.example/#/consent/p1"));
    }
}
