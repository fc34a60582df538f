use std::str::FromStr;

use crate::{
    auth::Caller,
    error::{StudioError, StudioResult},
    models::{Appointment, AppointmentInput, AppointmentStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GetArtworks,
    SaveArtwork,
    DeleteArtwork,
    RecordView,
    GetAppointments,
    SaveAppointment,
    DeleteAppointment,
    CancelAppointment,
    GetCategories,
    AddCategory,
    DeleteCategory,
    GetAftercare,
    SaveAftercare,
    SyncUser,
    GetAllUsers,
    ToggleFavorite,
    GetArtworkStats,
    GetConsent,
    SaveConsent,
    ConfirmDeposit,
    ConfirmPayment,
    ConfirmBooking,
    CompleteAppointment,
    CreateCustomOrder,
    GetDepositMessage,
    GetConsentMessage,
    UploadImage,
    ComposePreview,
}

/// Who may attempt an action before any row is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    SignedIn,
    Admin,
    /// Signed in, and the handler checks ownership of the target row.
    Owner,
    /// The handler narrows what the caller sees or may write.
    Scoped,
}

impl Action {
    pub const ALL: [Action; 28] = [
        Action::GetArtworks,
        Action::SaveArtwork,
        Action::DeleteArtwork,
        Action::RecordView,
        Action::GetAppointments,
        Action::SaveAppointment,
        Action::DeleteAppointment,
        Action::CancelAppointment,
        Action::GetCategories,
        Action::AddCategory,
        Action::DeleteCategory,
        Action::GetAftercare,
        Action::SaveAftercare,
        Action::SyncUser,
        Action::GetAllUsers,
        Action::ToggleFavorite,
        Action::GetArtworkStats,
        Action::GetConsent,
        Action::SaveConsent,
        Action::ConfirmDeposit,
        Action::ConfirmPayment,
        Action::ConfirmBooking,
        Action::CompleteAppointment,
        Action::CreateCustomOrder,
        Action::GetDepositMessage,
        Action::GetConsentMessage,
        Action::UploadImage,
        Action::ComposePreview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::GetArtworks => "getArtworks",
            Action::SaveArtwork => "saveArtwork",
            Action::DeleteArtwork => "deleteArtwork",
            Action::RecordView => "recordView",
            Action::GetAppointments => "getAppointments",
            Action::SaveAppointment => "saveAppointment",
            Action::DeleteAppointment => "deleteAppointment",
            Action::CancelAppointment => "cancelAppointment",
            Action::GetCategories => "getCategories",
            Action::AddCategory => "addCategory",
            Action::DeleteCategory => "deleteCategory",
            Action::GetAftercare => "getAftercare",
            Action::SaveAftercare => "saveAftercare",
            Action::SyncUser => "syncUser",
            Action::GetAllUsers => "getAllUsers",
            Action::ToggleFavorite => "toggleFavorite",
            Action::GetArtworkStats => "getArtworkStats",
            Action::GetConsent => "getConsent",
            Action::SaveConsent => "saveConsent",
            Action::ConfirmDeposit => "confirmDeposit",
            Action::ConfirmPayment => "confirmPayment",
            Action::ConfirmBooking => "confirmBooking",
            Action::CompleteAppointment => "completeAppointment",
            Action::CreateCustomOrder => "createCustomOrder",
            Action::GetDepositMessage => "getDepositMessage",
            Action::GetConsentMessage => "getConsentMessage",
            Action::UploadImage => "uploadImage",
            Action::ComposePreview => "composePreview",
        }
    }

    /// Reads answer any verb; everything else insists on POST.
    pub fn requires_post(self) -> bool {
        !matches!(
            self,
            Action::GetArtworks
                | Action::GetAppointments
                | Action::GetCategories
                | Action::GetAftercare
                | Action::GetAllUsers
                | Action::GetArtworkStats
                | Action::GetConsent
                | Action::GetDepositMessage
                | Action::GetConsentMessage
        )
    }

    pub fn access(self) -> Access {
        match self {
            Action::GetArtworks
            | Action::RecordView
            | Action::GetCategories
            | Action::GetAftercare
            | Action::SyncUser
            | Action::GetArtworkStats => Access::Public,
            Action::SaveArtwork
            | Action::DeleteArtwork
            | Action::DeleteAppointment
            | Action::AddCategory
            | Action::DeleteCategory
            | Action::SaveAftercare
            | Action::GetAllUsers
            | Action::ConfirmDeposit
            | Action::ConfirmPayment
            | Action::ConfirmBooking
            | Action::CompleteAppointment
            | Action::CreateCustomOrder
            | Action::GetDepositMessage
            | Action::GetConsentMessage
            | Action::UploadImage => Access::Admin,
            Action::ToggleFavorite
            | Action::GetConsent
            | Action::SaveConsent
            | Action::CancelAppointment => Access::Owner,
            Action::ComposePreview => Access::SignedIn,
            Action::GetAppointments | Action::SaveAppointment => Access::Scoped,
        }
    }
}

impl FromStr for Action {
    type Err = StudioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| StudioError::InvalidAction(value.to_string()))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn authorize(action: Action, caller: &Caller) -> StudioResult<()> {
    match (action.access(), caller) {
        (Access::Public | Access::Scoped, _) => Ok(()),
        (_, Caller::Admin(_)) => Ok(()),
        (Access::Admin, Caller::Guest) => Err(StudioError::Unauthorized),
        (Access::Admin, Caller::Member(_)) => {
            Err(StudioError::Forbidden(format!("{action} is restricted to the studio")))
        }
        (Access::SignedIn | Access::Owner, Caller::Guest) => Err(StudioError::Unauthorized),
        (Access::SignedIn | Access::Owner, Caller::Member(_)) => Ok(()),
    }
}

/// Admins may touch anything; members only rows linked to them.
pub fn authorize_owner(caller: &Caller, owner_id: Option<&str>) -> StudioResult<()> {
    match caller {
        Caller::Admin(_) => Ok(()),
        Caller::Member(member) if owner_id == Some(member.id.as_str()) => Ok(()),
        Caller::Member(_) => Err(StudioError::Forbidden(
            "this record belongs to another customer".to_string(),
        )),
        Caller::Guest => Err(StudioError::Unauthorized),
    }
}

/// Members may only take an open slot, or open a new pending booking, for themselves.
pub fn authorize_booking(
    caller: &Caller,
    existing: Option<&Appointment>,
    input: &AppointmentInput,
) -> StudioResult<()> {
    let member = match caller {
        Caller::Admin(_) => return Ok(()),
        Caller::Guest => return Err(StudioError::Unauthorized),
        Caller::Member(member) => member,
    };

    if input.user_id.as_deref() != Some(member.id.as_str()) {
        return Err(StudioError::Forbidden(
            "bookings can only be made for yourself".to_string(),
        ));
    }
    if input.status != AppointmentStatus::Pending {
        return Err(StudioError::Forbidden(format!(
            "customers cannot set an appointment to {}",
            input.status
        )));
    }
    match existing {
        None => Ok(()),
        Some(slot) if slot.status == AppointmentStatus::Open => Ok(()),
        Some(_) => Err(StudioError::Forbidden(
            "this time slot is no longer open".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use rstest::rstest;

    fn member(id: &str) -> Caller {
        Caller::Member(AuthUser {
            id: id.into(),
            display_name: "Member".into(),
        })
    }

    fn admin() -> Caller {
        Caller::Admin(AuthUser {
            id: "admin-1".into(),
            display_name: "Studio Admin".into(),
        })
    }

    #[test]
    fn every_action_parses_back() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!(matches!(
            "dropTables".parse::<Action>(),
            Err(StudioError::InvalidAction(name)) if name == "dropTables"
        ));
    }

    #[rstest]
    #[case(Action::GetArtworks, false)]
    #[case(Action::GetConsent, false)]
    #[case(Action::SaveConsent, true)]
    #[case(Action::RecordView, true)]
    #[case(Action::SyncUser, true)]
    fn verb_rules(#[case] action: Action, #[case] post_only: bool) {
        assert_eq!(action.requires_post(), post_only);
    }

    #[test]
    fn admin_actions_reject_members_and_guests() {
        assert!(authorize(Action::SaveArtwork, &admin()).is_ok());
        assert!(matches!(
            authorize(Action::SaveArtwork, &member("u1")),
            Err(StudioError::Forbidden(_))
        ));
        assert!(matches!(
            authorize(Action::SaveArtwork, &Caller::Guest),
            Err(StudioError::Unauthorized)
        ));
    }

    #[test]
    fn public_actions_need_nobody() {
        assert!(authorize(Action::GetArtworks, &Caller::Guest).is_ok());
        assert!(authorize(Action::SyncUser, &Caller::Guest).is_ok());
        assert!(authorize(Action::GetAppointments, &Caller::Guest).is_ok());
    }

    fn booking(user_id: &str, status: AppointmentStatus) -> AppointmentInput {
        serde_json::from_value(serde_json::json!({
            "id": "p1",
            "date": "2026-11-02",
            "timeSlot": "14:00",
            "userId": user_id,
            "status": status,
        }))
        .unwrap()
    }

    fn slot(status: AppointmentStatus) -> Appointment {
        serde_json::from_value(serde_json::json!({
            "id": "p1",
            "date": "2026-11-02",
            "timeSlot": "14:00",
            "userId": null,
            "customerName": null,
            "phoneNumber": null,
            "status": status,
            "notes": null,
            "artworkId": null,
            "artworkTitle": null,
            "artworkImage": null,
            "totalPrice": null,
            "depositPaid": null,
            "tattooPosition": null,
            "tattooSize": null,
            "tattooColor": null,
            "consentNotes": null,
            "signatureData": null,
            "signedAt": null,
            "signerName": null,
            "signerPhone": null,
            "orderType": "CLAIMED",
            "createdAt": "2026-10-18T00:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn members_book_open_slots_for_themselves() {
        let input = booking("u1", AppointmentStatus::Pending);
        assert!(authorize_booking(&member("u1"), None, &input).is_ok());
        assert!(authorize_booking(&member("u1"), Some(&slot(AppointmentStatus::Open)), &input).is_ok());
        assert!(authorize_booking(&member("u1"), Some(&slot(AppointmentStatus::Booked)), &input).is_err());
        assert!(authorize_booking(&member("u2"), None, &input).is_err());
        assert!(matches!(
            authorize_booking(&Caller::Guest, None, &input),
            Err(StudioError::Unauthorized)
        ));
    }

    #[test]
    fn members_cannot_advance_the_workflow() {
        let input = booking("u1", AppointmentStatus::Booked);
        assert!(matches!(
            authorize_booking(&member("u1"), None, &input),
            Err(StudioError::Forbidden(_))
        ));
        assert!(authorize_booking(&admin(), None, &input).is_ok());
    }

    #[test]
    fn ownership_rules() {
        assert!(authorize(Action::ToggleFavorite, &member("u1")).is_ok());
        assert!(authorize_owner(&member("u1"), Some("u1")).is_ok());
        assert!(authorize_owner(&member("u1"), Some("u2")).is_err());
        assert!(authorize_owner(&member("u1"), None).is_err());
        assert!(authorize_owner(&admin(), None).is_ok());
        assert!(matches!(
            authorize_owner(&Caller::Guest, Some("u1")),
            Err(StudioError::Unauthorized)
        ));
    }
}
