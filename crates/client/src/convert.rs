//! Wire types → ledger model.
//!
//! Every conversion validates through the ledger constructors, so a payload
//! that breaks a ledger invariant fails here instead of being defaulted.

use api_types::{
    expense::ExpenseView, group::GroupView, settlement::PaymentConfirmationView,
};
use ledger::{
    Creditor, Currency, Expense, ExternalMember, ExternalSplit, Group, LedgerError, Money,
    PaymentConfirmation, RegisteredMember, RegisteredSplit,
};

pub(crate) fn currency(currency: api_types::Currency) -> Currency {
    match currency {
        api_types::Currency::Eur => Currency::Eur,
        api_types::Currency::Usd => Currency::Usd,
        api_types::Currency::Gbp => Currency::Gbp,
        api_types::Currency::Chf => Currency::Chf,
        api_types::Currency::Pln => Currency::Pln,
        api_types::Currency::Sek => Currency::Sek,
    }
}

pub(crate) fn api_currency(currency: Currency) -> api_types::Currency {
    match currency {
        Currency::Eur => api_types::Currency::Eur,
        Currency::Usd => api_types::Currency::Usd,
        Currency::Gbp => api_types::Currency::Gbp,
        Currency::Chf => api_types::Currency::Chf,
        Currency::Pln => api_types::Currency::Pln,
        Currency::Sek => api_types::Currency::Sek,
    }
}

/// Builds a group with an empty expense list.
pub(crate) fn group(view: GroupView) -> Result<Group, LedgerError> {
    let mut builder = Group::builder(view.id, view.name)
        .description(view.description)
        .estimated_price(view.estimated_price_minor.map(Money::new))
        .currency(currency(view.currency))
        .created_at(view.created_at)
        .owner(view.owner_id, view.is_owner);

    for member in view.registered_members {
        builder = builder.registered_member(RegisteredMember {
            id: member.id,
            display_name: member.display_name,
            phone: member.phone,
        });
    }
    for member in view.external_members {
        builder = builder.external_member(ExternalMember {
            id: member.id,
            display_name: member.display_name,
        });
    }

    builder.build()
}

pub(crate) fn expense(view: ExpenseView) -> Result<Expense, LedgerError> {
    let creditor = Creditor::from_ids(view.creditor_registered_id, view.creditor_external_id)
        .map_err(|err| match err {
            LedgerError::AmbiguousCreditor(reason) => {
                LedgerError::AmbiguousCreditor(format!("expense {}: {reason}", view.id))
            }
            other => other,
        })?;

    let registered_splits = view
        .registered_splits
        .into_iter()
        .map(|split| RegisteredSplit {
            id: split.id,
            debtor_id: split.debtor_id,
            amount: Money::new(split.amount_minor),
        })
        .collect();
    let external_splits = view
        .external_splits
        .into_iter()
        .map(|split| ExternalSplit {
            id: split.id,
            debtor_external_id: split.debtor_external_id,
            amount: Money::new(split.amount_minor),
        })
        .collect();

    Expense::new(
        view.id,
        view.group_id,
        Money::new(view.total_minor),
        creditor,
        registered_splits,
        external_splits,
    )
}

pub(crate) fn payment_confirmation(
    view: PaymentConfirmationView,
) -> Result<PaymentConfirmation, LedgerError> {
    PaymentConfirmation::from_server(
        view.id,
        view.user_expense_id,
        Money::new(view.confirmation_amount_minor),
        view.confirmation_date,
        view.is_confirmed,
        view.confirmed_at,
    )
}
