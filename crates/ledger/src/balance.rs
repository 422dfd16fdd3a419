//! Net balance of a member across a list of expenses.
//!
//! Sign convention: a positive balance means the member owes money into
//! the group, a negative balance means the group owes money to them.
//!
//! Per expense, the creditor contributes `-(total - own share)`: they are
//! owed everything they paid except their own part, which is not counted
//! again as debt. Any other member contributes their own share. When the
//! splits of every expense add up to its total, the balances of a group
//! sum to zero.

use serde::Serialize;

use crate::{Expense, LedgerError, MemberKey, Money, ResultLedger};

/// Derived net position of one member. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub member: MemberKey,
    pub net_amount: Money,
}

impl Balance {
    pub fn owes(&self) -> bool {
        self.net_amount.is_positive()
    }

    pub fn is_owed(&self) -> bool {
        self.net_amount.is_negative()
    }

    pub fn is_settled(&self) -> bool {
        self.net_amount.is_zero()
    }
}

/// Contribution of a single expense to `member`'s balance.
pub fn expense_contribution(member: MemberKey, expense: &Expense) -> ResultLedger<Money> {
    let own_share = expense.share_of(member)?;
    if expense.is_creditor(member) {
        let owed_back = expense
            .total
            .checked_sub(own_share)
            .ok_or(LedgerError::Overflow)?;
        Ok(-owed_back)
    } else {
        Ok(own_share)
    }
}

/// Sums the contributions of every expense.
///
/// Integer addition is commutative, so any permutation of `expenses`
/// yields the same balance.
pub fn compute_balance(member: MemberKey, expenses: &[Expense]) -> ResultLedger<Money> {
    let contributions = expenses
        .iter()
        .map(|expense| expense_contribution(member, expense))
        .collect::<Result<Vec<_>, _>>()?;
    Money::try_sum(contributions)
}
