//! The module contains `Expense` and its splits.

use crate::{LedgerError, MemberKey, Money, ResultLedger};

/// The member who paid for an expense.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Creditor {
    Registered(i64),
    External(i64),
}

impl Creditor {
    /// Builds the creditor from the two optional wire fields.
    ///
    /// Exactly one of them must be set.
    pub fn from_ids(registered: Option<i64>, external: Option<i64>) -> Result<Self, LedgerError> {
        match (registered, external) {
            (Some(id), None) => Ok(Self::Registered(id)),
            (None, Some(id)) => Ok(Self::External(id)),
            (Some(registered), Some(external)) => Err(LedgerError::AmbiguousCreditor(format!(
                "both registered {registered} and external {external} set"
            ))),
            (None, None) => Err(LedgerError::AmbiguousCreditor(
                "no creditor set".to_string(),
            )),
        }
    }

    pub fn key(self) -> MemberKey {
        match self {
            Self::Registered(id) => MemberKey::Registered(id),
            Self::External(id) => MemberKey::External(id),
        }
    }
}

/// Share of an expense owed by a registered member.
///
/// `id` identifies the share itself ("user expense") and is what payment
/// confirmations refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisteredSplit {
    pub id: i64,
    pub debtor_id: i64,
    pub amount: Money,
}

/// Share of an expense owed by an external member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternalSplit {
    pub id: i64,
    pub debtor_external_id: i64,
    pub amount: Money,
}

/// An expense paid by one member and split across others.
///
/// Expenses are read-only snapshots of server state: the client never edits
/// one, it replaces the whole list of a group on refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: i64,
    pub group_id: i64,
    pub total: Money,
    pub creditor: Creditor,
    pub registered_splits: Vec<RegisteredSplit>,
    pub external_splits: Vec<ExternalSplit>,
}

impl Expense {
    pub fn new(
        id: i64,
        group_id: i64,
        total: Money,
        creditor: Creditor,
        registered_splits: Vec<RegisteredSplit>,
        external_splits: Vec<ExternalSplit>,
    ) -> Result<Self, LedgerError> {
        if total.is_negative() {
            return Err(LedgerError::InvalidAmount(format!(
                "expense {id} has negative total {total}"
            )));
        }
        let negative_split = registered_splits
            .iter()
            .map(|split| split.amount)
            .chain(external_splits.iter().map(|split| split.amount))
            .find(|amount| amount.is_negative());
        if let Some(amount) = negative_split {
            return Err(LedgerError::InvalidAmount(format!(
                "expense {id} has negative split {amount}"
            )));
        }

        let expense = Self {
            id,
            group_id,
            total,
            creditor,
            registered_splits,
            external_splits,
        };
        // Every later sum over the splits stays in range once this one does.
        expense.split_total()?;
        Ok(expense)
    }

    pub fn is_creditor(&self, member: MemberKey) -> bool {
        self.creditor.key() == member
    }

    /// Amount `member` owes on this expense, `0` when they have no split.
    pub fn share_of(&self, member: MemberKey) -> ResultLedger<Money> {
        match member {
            MemberKey::Registered(id) => Money::try_sum(
                self.registered_splits
                    .iter()
                    .filter(|split| split.debtor_id == id)
                    .map(|split| split.amount),
            ),
            MemberKey::External(id) => Money::try_sum(
                self.external_splits
                    .iter()
                    .filter(|split| split.debtor_external_id == id)
                    .map(|split| split.amount),
            ),
        }
    }

    /// Sum of every split, registered and external.
    pub fn split_total(&self) -> ResultLedger<Money> {
        Money::try_sum(
            self.registered_splits
                .iter()
                .map(|split| split.amount)
                .chain(self.external_splits.iter().map(|split| split.amount)),
        )
    }

    /// `total − Σ splits`. Zero for a fully allocated expense.
    pub fn unallocated(&self) -> ResultLedger<Money> {
        self.total
            .checked_sub(self.split_total()?)
            .ok_or(LedgerError::Overflow)
    }

    /// Every member referenced by this expense, creditor first.
    pub fn participants(&self) -> impl Iterator<Item = MemberKey> + '_ {
        std::iter::once(self.creditor.key())
            .chain(
                self.registered_splits
                    .iter()
                    .map(|split| MemberKey::Registered(split.debtor_id)),
            )
            .chain(
                self.external_splits
                    .iter()
                    .map(|split| MemberKey::External(split.debtor_external_id)),
            )
    }

    /// Finds the registered share with the given "user expense" id.
    pub fn registered_split(&self, user_expense_id: i64) -> Option<&RegisteredSplit> {
        self.registered_splits
            .iter()
            .find(|split| split.id == user_expense_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dinner() -> Expense {
        Expense::new(
            1,
            10,
            Money::new(9_000),
            Creditor::Registered(1),
            vec![
                RegisteredSplit {
                    id: 100,
                    debtor_id: 1,
                    amount: Money::new(3_000),
                },
                RegisteredSplit {
                    id: 101,
                    debtor_id: 2,
                    amount: Money::new(3_000),
                },
            ],
            vec![ExternalSplit {
                id: 200,
                debtor_external_id: 1,
                amount: Money::new(2_000),
            }],
        )
        .unwrap()
    }

    #[test]
    fn creditor_requires_exactly_one_id() {
        assert_eq!(Creditor::from_ids(Some(1), None), Ok(Creditor::Registered(1)));
        assert_eq!(Creditor::from_ids(None, Some(4)), Ok(Creditor::External(4)));
        assert!(matches!(
            Creditor::from_ids(Some(1), Some(4)),
            Err(LedgerError::AmbiguousCreditor(_))
        ));
        assert!(matches!(
            Creditor::from_ids(None, None),
            Err(LedgerError::AmbiguousCreditor(_))
        ));
    }

    #[test]
    fn share_of_distinguishes_id_spaces() {
        let expense = dinner();
        assert_eq!(expense.share_of(MemberKey::Registered(1)), Ok(Money::new(3_000)));
        assert_eq!(expense.share_of(MemberKey::External(1)), Ok(Money::new(2_000)));
        assert_eq!(expense.share_of(MemberKey::External(2)), Ok(Money::ZERO));
    }

    #[test]
    fn unallocated_reports_missing_split() {
        let expense = dinner();
        assert_eq!(expense.split_total(), Ok(Money::new(8_000)));
        assert_eq!(expense.unallocated(), Ok(Money::new(1_000)));
    }

    #[test]
    fn overflowing_splits_are_rejected() {
        let split = |id, debtor_id, amount| RegisteredSplit {
            id,
            debtor_id,
            amount: Money::new(amount),
        };
        let err = Expense::new(
            3,
            10,
            Money::new(100),
            Creditor::Registered(1),
            vec![split(1, 1, i64::MAX), split(2, 2, 1)],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::Overflow);
    }

    #[test]
    fn helpers_report_overflow_on_hand_built_expense() {
        let mut expense = dinner();
        expense.registered_splits[1].debtor_id = 1;
        expense.registered_splits[1].amount = Money::new(i64::MAX);

        assert_eq!(expense.share_of(MemberKey::Registered(1)), Err(LedgerError::Overflow));
        assert_eq!(expense.split_total(), Err(LedgerError::Overflow));
        assert_eq!(expense.unallocated(), Err(LedgerError::Overflow));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let err = Expense::new(
            2,
            10,
            Money::new(100),
            Creditor::External(3),
            vec![RegisteredSplit {
                id: 1,
                debtor_id: 1,
                amount: Money::new(-100),
            }],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }
}
