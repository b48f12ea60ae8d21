use chrono::{DateTime, NaiveDate, Utc};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LoanEvent};
use crate::loan::Loan;
use crate::schedule::compute_schedule;
use crate::types::{AbonoApplication, OvercapPolicy, PaymentEntry};

/// outcome of an abono: the next loan state plus how the amount landed
#[derive(Debug, Clone, PartialEq)]
pub struct AbonoResult {
    pub loan: Loan,
    pub application: AbonoApplication,
}

/// partial edit of a loan's terms; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct TermsPatch {
    pub principal: Option<Money>,
    pub monthly_interest_rate: Option<Rate>,
    pub start_date: Option<NaiveDate>,
    pub term_days: Option<u32>,
}

/// apply a partial repayment against the loan's outstanding balance
///
/// the applied increment fills the earliest empty day-slots at
/// `daily_payment` each; the last touched slot may hold a partial amount.
/// Returns the next state without persisting it; the caller owns the
/// fetch-compute-persist cycle.
pub fn apply_abono(
    loan: &Loan,
    amount: Money,
    policy: OvercapPolicy,
    now: DateTime<Utc>,
    events: &mut EventStore,
) -> Result<AbonoResult> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAbono { amount });
    }

    let remaining = loan.outstanding();
    if policy == OvercapPolicy::Reject && amount > remaining {
        return Err(LedgerError::AbonoExceedsBalance {
            remaining,
            requested: amount,
        });
    }

    let new_recovered = (loan.recovered_amount + amount).min(loan.final_amount);
    let increment = new_recovered - loan.recovered_amount;
    let clipped = amount - increment;

    let mut next = loan.clone();
    let slots_touched = fill_slots(&mut next, increment, now);
    next.recovered_amount = new_recovered;

    debug_assert_eq!(next.history_total(), next.recovered_amount);

    if !clipped.is_zero() {
        events.emit(LoanEvent::AbonoClipped {
            loan_id: loan.id,
            requested: amount,
            clipped,
            final_amount: loan.final_amount,
            timestamp: now,
        });
    }

    events.emit(LoanEvent::AbonoApplied {
        loan_id: loan.id,
        requested: amount,
        applied: increment,
        new_recovered,
        slots_touched,
        timestamp: now,
    });

    if next.is_fully_recovered() && !loan.is_fully_recovered() {
        events.emit(LoanEvent::LoanFullyRecovered {
            loan_id: loan.id,
            final_amount: loan.final_amount,
            timestamp: now,
        });
    }

    Ok(AbonoResult {
        loan: next,
        application: AbonoApplication {
            requested: amount,
            applied: increment,
            clipped,
            slots_touched,
        },
    })
}

/// distribute an increment over the payment history, earliest slots first
fn fill_slots(loan: &mut Loan, increment: Money, now: DateTime<Utc>) -> u32 {
    let daily = loan.daily_payment;
    let mut remaining = increment;
    let mut touched = 0u32;
    let mut last_touched: Option<usize> = None;

    // earliest empty slots take up to a full daily payment each
    for (i, slot) in loan.payment_history.iter_mut().enumerate() {
        if remaining.is_zero() {
            break;
        }
        if slot.is_none() {
            let fill = remaining.min(daily);
            *slot = Some(PaymentEntry {
                amount: fill,
                applied_at: now,
            });
            remaining -= fill;
            touched += 1;
            last_touched = Some(i);
        }
    }

    // earlier abonos can leave partial slots; top those up once the empty
    // slots run out, keeping the original applied_at
    if !remaining.is_zero() {
        for (i, slot) in loan.payment_history.iter_mut().enumerate() {
            if remaining.is_zero() {
                break;
            }
            if let Some(entry) = slot {
                let capacity = (daily - entry.amount).max(Money::ZERO);
                if capacity.is_zero() {
                    continue;
                }
                let top_up = remaining.min(capacity);
                entry.amount += top_up;
                remaining -= top_up;
                touched += 1;
                last_touched = Some(i);
            }
        }
    }

    // rounding dust from daily_payment's fixed precision lands on the last
    // touched slot so the sum invariant holds exactly
    if !remaining.is_zero() {
        if let Some(i) = last_touched.or_else(|| {
            loan.payment_history.iter().rposition(|s| s.is_some())
        }) {
            if let Some(entry) = &mut loan.payment_history[i] {
                entry.amount += remaining;
            }
        }
    }

    touched
}

/// toggle one day-slot paid or unpaid
///
/// the recovered amount is recomputed as the sum over the toggled history,
/// never incrementally, so repeated toggles cannot drift
pub fn mark_day_paid(
    loan: &Loan,
    day_index: usize,
    paid: bool,
    now: DateTime<Utc>,
    events: &mut EventStore,
) -> Result<Loan> {
    if day_index >= loan.term_days as usize {
        return Err(LedgerError::IndexOutOfRange {
            index: day_index,
            term_days: loan.term_days,
        });
    }

    let mut next = loan.clone();
    let slot = &mut next.payment_history[day_index];

    if paid {
        // already-recorded slots are left untouched for idempotence
        if slot.is_none() {
            *slot = Some(PaymentEntry {
                amount: next.daily_payment,
                applied_at: now,
            });
        }
    } else {
        *slot = None;
    }

    next.recovered_amount = next.history_total();

    events.emit(LoanEvent::DayMarked {
        loan_id: loan.id,
        day_index,
        paid,
        new_recovered: next.recovered_amount,
        timestamp: now,
    });

    Ok(next)
}

/// revise a loan's terms, recomputing the schedule going forward
///
/// recorded day-slots are never rescaled. A term resize preserves entries
/// below `min(old, new)` length and recomputes the recovered amount from
/// the retained entries. Validation happens before any field is changed.
pub fn edit_terms(
    loan: &Loan,
    patch: TermsPatch,
    now: DateTime<Utc>,
    events: &mut EventStore,
) -> Result<Loan> {
    let principal = patch.principal.unwrap_or(loan.principal);
    let rate = patch.monthly_interest_rate.unwrap_or(loan.monthly_interest_rate);
    let start_date = patch.start_date.unwrap_or(loan.start_date);
    let term_days = patch.term_days.unwrap_or(loan.term_days);

    let schedule = compute_schedule(principal, rate, term_days)?;

    // sum over the entries that survive a resize, computed before mutating
    let retained_total: Money = loan
        .payment_history
        .iter()
        .take(term_days as usize)
        .flatten()
        .map(|entry| entry.amount)
        .sum();

    // the revised final amount must still cover what was already recorded
    if schedule.final_amount < retained_total {
        return Err(LedgerError::InvalidPrincipal { amount: principal });
    }

    let mut next = loan.clone();
    next.principal = principal;
    next.monthly_interest_rate = rate;
    next.start_date = start_date;
    next.term_days = term_days;
    next.final_amount = schedule.final_amount;
    next.daily_payment = schedule.daily_payment;

    if term_days as usize != loan.payment_history.len() {
        next.payment_history.resize(term_days as usize, None);
    }
    next.recovered_amount = retained_total;

    debug_assert_eq!(next.history_total(), next.recovered_amount);

    events.emit(LoanEvent::TermsEdited {
        loan_id: loan.id,
        old_final_amount: loan.final_amount,
        new_final_amount: next.final_amount,
        old_term_days: loan.term_days,
        new_term_days: term_days,
        new_recovered: next.recovered_amount,
        timestamp: now,
    });

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LoanStatus;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 3000 interest-free over 30 days: final 3000, daily exactly 100
    fn flat_loan() -> Loan {
        Loan::new(
            "client-1".to_string(),
            Money::from_major(3000),
            Rate::ZERO,
            date(2024, 1, 1),
            30,
            Utc::now(),
        )
        .unwrap()
    }

    /// 1000 at 3% over 30 days: final 1030, daily 34.33...
    fn interest_loan() -> Loan {
        Loan::new(
            "client-1".to_string(),
            Money::from_major(1000),
            Rate::from_percentage(dec!(3)),
            date(2024, 1, 1),
            30,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_abono_rejects_non_positive_amount() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let err = apply_abono(&loan, Money::ZERO, OvercapPolicy::Clip, Utc::now(), &mut events)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAbono { .. }));

        let err = apply_abono(
            &loan,
            Money::from_major(-10),
            OvercapPolicy::Clip,
            Utc::now(),
            &mut events,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAbono { .. }));
        assert!(events.events().is_empty());
    }

    #[test]
    fn test_abono_fills_earliest_slots() {
        // 500 against daily 100 fills slots 0-4 fully, slot 5 stays empty
        let loan = flat_loan();
        let mut events = EventStore::new();

        let result = apply_abono(
            &loan,
            Money::from_major(500),
            OvercapPolicy::Clip,
            Utc::now(),
            &mut events,
        )
        .unwrap();
        let next = result.loan;

        assert_eq!(next.recovered_amount, Money::from_major(500));
        for i in 0..5 {
            assert_eq!(next.payment_history[i].unwrap().amount, Money::from_major(100));
        }
        assert!(next.payment_history[5].is_none());
        assert_eq!(result.application.slots_touched, 5);
        assert_eq!(next.history_total(), next.recovered_amount);
    }

    #[test]
    fn test_abono_partial_last_slot() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let next = apply_abono(
            &loan,
            Money::from_major(250),
            OvercapPolicy::Clip,
            Utc::now(),
            &mut events,
        )
        .unwrap()
        .loan;

        assert_eq!(next.payment_history[0].unwrap().amount, Money::from_major(100));
        assert_eq!(next.payment_history[1].unwrap().amount, Money::from_major(100));
        assert_eq!(next.payment_history[2].unwrap().amount, Money::from_major(50));
        assert!(next.payment_history[3].is_none());
        assert_eq!(next.history_total(), Money::from_major(250));
    }

    #[test]
    fn test_abonos_summing_to_final_fill_everything() {
        let loan = interest_loan();
        let mut events = EventStore::new();

        let mid = apply_abono(
            &loan,
            Money::from_major(500),
            OvercapPolicy::Clip,
            Utc::now(),
            &mut events,
        )
        .unwrap()
        .loan;
        let done = apply_abono(
            &mid,
            Money::from_major(530),
            OvercapPolicy::Clip,
            Utc::now(),
            &mut events,
        )
        .unwrap()
        .loan;

        assert_eq!(done.recovered_amount, Money::from_major(1030));
        assert!(done.payment_history.iter().all(|s| s.is_some()));
        assert!(done.is_fully_recovered());
        assert_eq!(done.history_total(), done.recovered_amount);
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, LoanEvent::LoanFullyRecovered { .. })));
    }

    #[test]
    fn test_abono_over_cap_clips() {
        // 1200 against final 1030 clips to 1030
        let loan = interest_loan();
        let mut events = EventStore::new();

        let result = apply_abono(
            &loan,
            Money::from_major(1200),
            OvercapPolicy::Clip,
            Utc::now(),
            &mut events,
        )
        .unwrap();

        assert_eq!(result.loan.recovered_amount, Money::from_major(1030));
        assert_eq!(result.application.applied, Money::from_major(1030));
        assert_eq!(result.application.clipped, Money::from_major(170));
        assert!(result.application.was_clipped());
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, LoanEvent::AbonoClipped { .. })));
    }

    #[test]
    fn test_abono_over_cap_rejects_under_strict_policy() {
        let loan = interest_loan();
        let mut events = EventStore::new();

        let err = apply_abono(
            &loan,
            Money::from_major(1200),
            OvercapPolicy::Reject,
            Utc::now(),
            &mut events,
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::AbonoExceedsBalance { .. }));
        assert!(events.events().is_empty());
    }

    #[test]
    fn test_abono_tops_up_partial_slots_when_empty_ones_run_out() {
        // term 2, daily 100: a 50 abono leaves slot 0 partial; a 150 abono
        // then needs slot 1 plus the rest of slot 0
        let loan = Loan::new(
            "client-1".to_string(),
            Money::from_major(200),
            Rate::ZERO,
            date(2024, 1, 1),
            2,
            Utc::now(),
        )
        .unwrap();
        let mut events = EventStore::new();

        let mid = apply_abono(&loan, Money::from_major(50), OvercapPolicy::Clip, Utc::now(), &mut events)
            .unwrap()
            .loan;
        let done = apply_abono(&mid, Money::from_major(150), OvercapPolicy::Clip, Utc::now(), &mut events)
            .unwrap()
            .loan;

        assert_eq!(done.recovered_amount, Money::from_major(200));
        assert_eq!(done.payment_history[0].unwrap().amount, Money::from_major(100));
        assert_eq!(done.payment_history[1].unwrap().amount, Money::from_major(100));
        assert_eq!(done.history_total(), done.recovered_amount);
    }

    #[test]
    fn test_mark_day_paid_records_full_daily_payment() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let next = mark_day_paid(&loan, 0, true, Utc::now(), &mut events).unwrap();

        assert_eq!(next.recovered_amount, Money::from_major(100));
        assert_eq!(next.payment_history[0].unwrap().amount, Money::from_major(100));
    }

    #[test]
    fn test_mark_day_paid_is_idempotent() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let once = mark_day_paid(&loan, 3, true, Utc::now(), &mut events).unwrap();
        let twice = mark_day_paid(&once, 3, true, Utc::now(), &mut events).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_mark_day_paid_is_reversible() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let marked = mark_day_paid(&loan, 3, true, Utc::now(), &mut events).unwrap();
        let unmarked = mark_day_paid(&marked, 3, false, Utc::now(), &mut events).unwrap();

        assert_eq!(unmarked.recovered_amount, loan.recovered_amount);
        assert!(unmarked.payment_history[3].is_none());
    }

    #[test]
    fn test_unmarking_a_partial_slot_drops_its_amount() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        // abono of 250 leaves slot 2 holding 50
        let next = apply_abono(&loan, Money::from_major(250), OvercapPolicy::Clip, Utc::now(), &mut events)
            .unwrap()
            .loan;
        let toggled = mark_day_paid(&next, 2, false, Utc::now(), &mut events).unwrap();

        assert_eq!(toggled.recovered_amount, Money::from_major(200));
        assert_eq!(toggled.history_total(), toggled.recovered_amount);
    }

    #[test]
    fn test_mark_day_paid_rejects_bad_index() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let err = mark_day_paid(&loan, 30, true, Utc::now(), &mut events).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::IndexOutOfRange { index: 30, term_days: 30 }
        ));
    }

    #[test]
    fn test_edit_terms_recomputes_schedule() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let next = edit_terms(
            &loan,
            TermsPatch {
                monthly_interest_rate: Some(Rate::from_percentage(dec!(3))),
                ..Default::default()
            },
            Utc::now(),
            &mut events,
        )
        .unwrap();

        // 3000 at 3% over 30 days adds 90 interest
        assert_eq!(next.final_amount, Money::from_major(3090));
        assert_eq!(next.daily_payment, Money::from_major(103));
        assert_eq!(next.principal, loan.principal);
        assert_eq!(next.term_days, loan.term_days);
    }

    #[test]
    fn test_edit_terms_shrink_preserves_retained_entries() {
        // payments recorded in slots 0-4 only, then term 30 -> 10
        let loan = flat_loan();
        let mut events = EventStore::new();
        let paid = apply_abono(&loan, Money::from_major(500), OvercapPolicy::Clip, Utc::now(), &mut events)
            .unwrap()
            .loan;

        let next = edit_terms(
            &paid,
            TermsPatch {
                term_days: Some(10),
                ..Default::default()
            },
            Utc::now(),
            &mut events,
        )
        .unwrap();

        assert_eq!(next.payment_history.len(), 10);
        assert_eq!(next.paid_day_count(), 5);
        assert_eq!(next.recovered_amount, Money::from_major(500));
        assert_eq!(next.history_total(), next.recovered_amount);
        // daily payment revised going forward: 3000 / 10
        assert_eq!(next.daily_payment, Money::from_major(300));
    }

    #[test]
    fn test_edit_terms_shrink_drops_out_of_range_entries() {
        let loan = flat_loan();
        let mut events = EventStore::new();
        // record a payment deep into the term, then shrink past it
        let paid = mark_day_paid(&loan, 20, true, Utc::now(), &mut events).unwrap();
        assert_eq!(paid.recovered_amount, Money::from_major(100));

        let next = edit_terms(
            &paid,
            TermsPatch {
                term_days: Some(10),
                ..Default::default()
            },
            Utc::now(),
            &mut events,
        )
        .unwrap();

        // the dropped entry's contribution is recomputed away, not subtracted
        assert_eq!(next.recovered_amount, Money::ZERO);
        assert_eq!(next.history_total(), Money::ZERO);
    }

    #[test]
    fn test_edit_terms_grow_adds_empty_slots() {
        let loan = flat_loan();
        let mut events = EventStore::new();
        let paid = apply_abono(&loan, Money::from_major(500), OvercapPolicy::Clip, Utc::now(), &mut events)
            .unwrap()
            .loan;

        let next = edit_terms(
            &paid,
            TermsPatch {
                term_days: Some(45),
                ..Default::default()
            },
            Utc::now(),
            &mut events,
        )
        .unwrap();

        assert_eq!(next.payment_history.len(), 45);
        assert_eq!(next.paid_day_count(), 5);
        assert!(next.payment_history[30..].iter().all(|s| s.is_none()));
        assert_eq!(next.recovered_amount, Money::from_major(500));
    }

    #[test]
    fn test_edit_terms_moves_start_date() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let next = edit_terms(
            &loan,
            TermsPatch {
                start_date: Some(date(2024, 2, 1)),
                ..Default::default()
            },
            Utc::now(),
            &mut events,
        )
        .unwrap();

        assert_eq!(next.start_date, date(2024, 2, 1));
        assert_eq!(next.status(date(2024, 3, 1)), LoanStatus::Active);
        assert_eq!(next.status(date(2024, 3, 2)), LoanStatus::Terminated);
    }

    #[test]
    fn test_edit_terms_validates_before_mutating() {
        let loan = flat_loan();
        let mut events = EventStore::new();

        let err = edit_terms(
            &loan,
            TermsPatch {
                principal: Some(Money::ZERO),
                term_days: Some(10),
                ..Default::default()
            },
            Utc::now(),
            &mut events,
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidPrincipal { .. }));
        assert!(events.events().is_empty());
    }

    #[test]
    fn test_edit_terms_rejects_final_below_recorded_total() {
        let loan = flat_loan();
        let mut events = EventStore::new();
        let paid = apply_abono(&loan, Money::from_major(2000), OvercapPolicy::Clip, Utc::now(), &mut events)
            .unwrap()
            .loan;

        // shrinking principal to 1000 would leave final below the 2000 recorded
        let err = edit_terms(
            &paid,
            TermsPatch {
                principal: Some(Money::from_major(1000)),
                ..Default::default()
            },
            Utc::now(),
            &mut events,
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidPrincipal { .. }));
    }
}
