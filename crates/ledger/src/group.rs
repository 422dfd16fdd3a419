//! The module contains `Group`, the aggregate root of the ledger.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use crate::{
    Balance, Currency, Expense, ExternalMember, LedgerError, Member, MemberKey, Money,
    RegisteredMember, ResultLedger, balance,
};

/// Snapshot of one group's membership and expenses as returned by the
/// server.
///
/// A group is replaced wholesale on every successful fetch; there is no
/// partial merge. Construction through [`GroupBuilder`] enforces:
///
/// - member ids are unique within each variant;
/// - `owner_id` references a registered member;
/// - every expense belongs to this group and only references its members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    id: i64,
    name: String,
    description: Option<String>,
    estimated_price: Option<Money>,
    currency: Currency,
    created_at: DateTime<FixedOffset>,
    owner_id: i64,
    is_owner: bool,
    registered_members: Vec<RegisteredMember>,
    external_members: Vec<ExternalMember>,
    expenses: Vec<Expense>,
}

impl Group {
    /// Return a builder for `Group`.
    pub fn builder(id: i64, name: impl Into<String>) -> GroupBuilder {
        GroupBuilder {
            id,
            name: name.into(),
            description: None,
            estimated_price: None,
            currency: Currency::default(),
            created_at: DateTime::default(),
            owner_id: 0,
            is_owner: false,
            registered_members: Vec::new(),
            external_members: Vec::new(),
            expenses: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn estimated_price(&self) -> Option<Money> {
        self.estimated_price
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn created_at(&self) -> DateTime<FixedOffset> {
        self.created_at
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    /// `true` when the session user owns this group.
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    pub fn registered_members(&self) -> &[RegisteredMember] {
        &self.registered_members
    }

    pub fn external_members(&self) -> &[ExternalMember] {
        &self.external_members
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn owner(&self) -> Option<&RegisteredMember> {
        self.registered_members
            .iter()
            .find(|member| member.id == self.owner_id)
    }

    pub fn member(&self, key: MemberKey) -> Option<Member<'_>> {
        match key {
            MemberKey::Registered(id) => self
                .registered_members
                .iter()
                .find(|member| member.id == id)
                .map(Member::Registered),
            MemberKey::External(id) => self
                .external_members
                .iter()
                .find(|member| member.id == id)
                .map(Member::External),
        }
    }

    /// Registered members first, then external ones, in server order.
    pub fn members(&self) -> impl Iterator<Item = Member<'_>> + '_ {
        self.registered_members
            .iter()
            .map(Member::Registered)
            .chain(self.external_members.iter().map(Member::External))
    }

    /// Returns a copy of this group with its expense list replaced.
    ///
    /// The new list is validated against the current membership.
    pub fn with_expenses(&self, expenses: Vec<Expense>) -> ResultLedger<Group> {
        let mut group = Group {
            expenses: Vec::new(),
            ..self.clone()
        };
        group.validate_expenses(&expenses)?;
        group.expenses = expenses;
        Ok(group)
    }

    /// Net balance of one member across every expense of the group.
    pub fn balance_of(&self, member: MemberKey) -> ResultLedger<Money> {
        if self.member(member).is_none() {
            return Err(LedgerError::UnknownMember(member.to_string()));
        }
        balance::compute_balance(member, &self.expenses)
    }

    /// One balance per member, zero balances included.
    pub fn balances(&self) -> ResultLedger<Vec<Balance>> {
        self.members()
            .map(|member| {
                let key = member.key();
                balance::compute_balance(key, &self.expenses)
                    .map(|net_amount| Balance { member: key, net_amount })
            })
            .collect()
    }

    fn validate_expenses(&self, expenses: &[Expense]) -> Result<(), LedgerError> {
        for expense in expenses {
            if expense.group_id != self.id {
                return Err(LedgerError::UnknownMember(format!(
                    "expense {} belongs to group {}, not {}",
                    expense.id, expense.group_id, self.id
                )));
            }
            if let Some(missing) = expense
                .participants()
                .find(|key| self.member(*key).is_none())
            {
                return Err(LedgerError::UnknownMember(format!(
                    "expense {} references {missing}",
                    expense.id
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`Group`].
#[derive(Debug)]
pub struct GroupBuilder {
    id: i64,
    name: String,
    description: Option<String>,
    estimated_price: Option<Money>,
    currency: Currency,
    created_at: DateTime<FixedOffset>,
    owner_id: i64,
    is_owner: bool,
    registered_members: Vec<RegisteredMember>,
    external_members: Vec<ExternalMember>,
    expenses: Vec<Expense>,
}

impl GroupBuilder {
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn estimated_price(mut self, estimated_price: Option<Money>) -> Self {
        self.estimated_price = estimated_price;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<FixedOffset>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Owner id and whether the session user is that owner.
    pub fn owner(mut self, owner_id: i64, is_owner: bool) -> Self {
        self.owner_id = owner_id;
        self.is_owner = is_owner;
        self
    }

    pub fn registered_member(mut self, member: RegisteredMember) -> Self {
        self.registered_members.push(member);
        self
    }

    pub fn external_member(mut self, member: ExternalMember) -> Self {
        self.external_members.push(member);
        self
    }

    pub fn expenses(mut self, expenses: Vec<Expense>) -> Self {
        self.expenses = expenses;
        self
    }

    /// Construct `Group`, rejecting payloads that break its invariants.
    pub fn build(self) -> ResultLedger<Group> {
        let mut seen = HashSet::new();
        let keys = self
            .registered_members
            .iter()
            .map(RegisteredMember::key)
            .chain(self.external_members.iter().map(ExternalMember::key));
        for key in keys {
            if !seen.insert(key) {
                return Err(LedgerError::DuplicateMember(key.to_string()));
            }
        }

        if !seen.contains(&MemberKey::Registered(self.owner_id)) {
            return Err(LedgerError::InvalidOwner(format!(
                "owner {} of group {} is not a registered member",
                self.owner_id, self.id
            )));
        }

        let group = Group {
            id: self.id,
            name: self.name,
            description: self.description,
            estimated_price: self.estimated_price,
            currency: self.currency,
            created_at: self.created_at,
            owner_id: self.owner_id,
            is_owner: self.is_owner,
            registered_members: self.registered_members,
            external_members: self.external_members,
            expenses: Vec::new(),
        };
        group.with_expenses(self.expenses)
    }
}
