//! Invite operations.

use super::Registry;
use crate::models::{
    paginate, CreateInviteRequest, Invite, InviteDeleted, InviteRole, InviteStatus, Page,
    PageRequest, ADMIN_MAX_PAGE_LIMIT,
};
use crate::storage::{Collection, ReadRecords};
use crate::{validate, Error, InviteId, Result, Timestamp};

fn load(tx: &impl ReadRecords, id: &InviteId) -> Result<(u64, Invite)> {
    tx.get(Collection::Invites, id.as_str())?
        .ok_or_else(|| Error::not_found(format!("invite '{}' not found", id)))
}

impl Registry {
    /// Send a new invite.
    ///
    /// The `admin` role cannot be granted by invite, and an address may only
    /// have one pending invite at a time.
    pub fn create_invite(&self, request: &CreateInviteRequest, now: Timestamp) -> Result<Invite> {
        validate::email(&request.email)?;
        if request.role == InviteRole::Admin {
            return Err(Error::invalid("role: 'admin' cannot be granted by invite"));
        }

        self.transact(|tx| {
            let existing: Vec<(u64, Invite)> = tx.list(Collection::Invites)?;
            let duplicate = existing.iter().any(|(_, invite)| {
                invite.email.eq_ignore_ascii_case(&request.email)
                    && invite.status_at(now) == InviteStatus::Pending
            });
            if duplicate {
                return Err(Error::invalid(format!(
                    "email: '{}' already has a pending invite",
                    request.email
                )));
            }

            let seq = tx.next_sequence(Collection::Invites)?;
            let invite = Invite::pending(
                InviteId::from_sequence(seq),
                request.email.clone(),
                request.role,
                now,
            );
            tx.put(Collection::Invites, invite.id.as_str(), seq, &invite)?;
            Ok(invite)
        })
    }

    /// `GET /v1/organizations/invites/{invite_id}`.
    pub fn get_invite(&self, id: &InviteId, now: Timestamp) -> Result<Invite> {
        let (_, invite) = self.read(|tx| load(tx, id))?;
        Ok(invite.observed_at(now))
    }

    /// Invites in the order they were sent, deleted ones excluded.
    pub fn list_invites(&self, page: &PageRequest, now: Timestamp) -> Result<Page<Invite>> {
        let all: Vec<(u64, Invite)> = self.read(|tx| tx.list(Collection::Invites))?;
        let visible: Vec<Invite> = all
            .into_iter()
            .map(|(_, invite)| invite.observed_at(now))
            .filter(|invite| invite.status != InviteStatus::Deleted)
            .collect();
        paginate(visible, page, ADMIN_MAX_PAGE_LIMIT, |invite| invite.id.as_str())
    }

    /// Withdraw a pending (or lapsed) invite.
    ///
    /// The invite stays readable with status `deleted`.
    pub fn delete_invite(&self, id: &InviteId, now: Timestamp) -> Result<InviteDeleted> {
        self.transact(|tx| {
            let (seq, mut invite) = load(tx, id)?;
            match invite.status_at(now) {
                InviteStatus::Pending | InviteStatus::Expired => {
                    invite.status = InviteStatus::Deleted;
                    tx.put(Collection::Invites, id.as_str(), seq, &invite)?;
                    Ok(InviteDeleted::new(id.clone()))
                }
                InviteStatus::Accepted => Err(Error::invalid(format!(
                    "invite '{}' has already been accepted",
                    id
                ))),
                InviteStatus::Deleted => Err(Error::invalid(format!(
                    "invite '{}' has already been deleted",
                    id
                ))),
            }
        })
    }

    /// Mark a pending invite as accepted.
    pub fn accept_invite(&self, id: &InviteId, now: Timestamp) -> Result<Invite> {
        self.transact(|tx| {
            let (seq, mut invite) = load(tx, id)?;
            match invite.status_at(now) {
                InviteStatus::Pending => {
                    invite.status = InviteStatus::Accepted;
                    tx.put(Collection::Invites, id.as_str(), seq, &invite)?;
                    Ok(invite)
                }
                other => Err(Error::invalid(format!(
                    "invite '{}' is {} and cannot be accepted",
                    id, other
                ))),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn t0() -> Timestamp {
        Timestamp::parse("2024-10-30T23:58:27.427722Z").unwrap()
    }

    fn request(email: &str, role: InviteRole) -> CreateInviteRequest {
        CreateInviteRequest {
            email: email.to_string(),
            role,
        }
    }

    #[test]
    fn create_then_get() {
        let reg = Registry::in_memory().unwrap();
        let invite = reg
            .create_invite(&request("user@emaildomain.com", InviteRole::User), t0())
            .unwrap();
        assert!(invite.id.as_str().starts_with("invite_"));
        assert_eq!(invite.status, InviteStatus::Pending);
        assert_eq!(invite.invited_at, t0());
        assert_eq!(invite.expires_at, t0().plus_days(21));

        let fetched = reg.get_invite(&invite.id, t0()).unwrap();
        assert_eq!(fetched, invite);
    }

    #[test]
    fn unknown_invite_is_not_found() {
        let reg = Registry::in_memory().unwrap();
        let err = reg
            .get_invite(&InviteId::parse("invite_missing").unwrap(), t0())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
    }

    #[test]
    fn admin_role_and_bad_email_are_rejected() {
        let reg = Registry::in_memory().unwrap();
        let err = reg
            .create_invite(&request("a@example.com", InviteRole::Admin), t0())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequestError);
        assert!(reg
            .create_invite(&request("not-an-email", InviteRole::User), t0())
            .is_err());
    }

    #[test]
    fn one_pending_invite_per_address() {
        let reg = Registry::in_memory().unwrap();
        reg.create_invite(&request("dev@example.com", InviteRole::Developer), t0())
            .unwrap();
        let err = reg
            .create_invite(&request("DEV@example.com", InviteRole::Billing), t0())
            .unwrap_err();
        assert!(err.to_string().contains("already has a pending invite"));

        // Once the first one lapses, a new invite may be sent.
        let later = t0().plus_days(22);
        assert!(reg
            .create_invite(&request("dev@example.com", InviteRole::Developer), later)
            .is_ok());
    }

    #[test]
    fn pending_invites_expire_on_read() {
        let reg = Registry::in_memory().unwrap();
        let invite = reg
            .create_invite(&request("late@example.com", InviteRole::User), t0())
            .unwrap();
        let read = reg.get_invite(&invite.id, t0().plus_days(21)).unwrap();
        assert_eq!(read.status, InviteStatus::Expired);
    }

    #[test]
    fn delete_leaves_a_tombstone() {
        let reg = Registry::in_memory().unwrap();
        let invite = reg
            .create_invite(&request("gone@example.com", InviteRole::User), t0())
            .unwrap();
        let receipt = reg.delete_invite(&invite.id, t0()).unwrap();
        assert_eq!(receipt.id, invite.id);

        let read = reg.get_invite(&invite.id, t0()).unwrap();
        assert_eq!(read.status, InviteStatus::Deleted);
        assert!(reg.delete_invite(&invite.id, t0()).is_err());

        let page = reg.list_invites(&PageRequest::default(), t0()).unwrap();
        assert!(page.data.is_empty());
    }

    #[test]
    fn accepted_invites_cannot_be_deleted() {
        let reg = Registry::in_memory().unwrap();
        let invite = reg
            .create_invite(&request("yes@example.com", InviteRole::Billing), t0())
            .unwrap();
        let accepted = reg.accept_invite(&invite.id, t0()).unwrap();
        assert_eq!(accepted.status, InviteStatus::Accepted);
        assert!(reg.accept_invite(&invite.id, t0()).is_err());
        assert!(reg.delete_invite(&invite.id, t0()).is_err());
    }

    #[test]
    fn expired_invites_cannot_be_accepted() {
        let reg = Registry::in_memory().unwrap();
        let invite = reg
            .create_invite(&request("slow@example.com", InviteRole::User), t0())
            .unwrap();
        let err = reg
            .accept_invite(&invite.id, t0().plus_days(30))
            .unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn list_is_in_send_order() {
        let reg = Registry::in_memory().unwrap();
        let ids: Vec<_> = (0..3)
            .map(|i| {
                reg.create_invite(
                    &request(&format!("u{}@example.com", i), InviteRole::User),
                    t0(),
                )
                .unwrap()
                .id
            })
            .collect();

        let page = reg.list_invites(&PageRequest::first(2), t0()).unwrap();
        assert_eq!(page.data.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.first_id.as_deref(), Some(ids[0].as_str()));

        let next = reg
            .list_invites(&PageRequest::after(ids[1].as_str(), 2), t0())
            .unwrap();
        assert_eq!(next.data.len(), 1);
        assert_eq!(next.data[0].id, ids[2]);
        assert!(!next.has_more);
    }
}
