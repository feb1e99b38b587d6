use crate::domain::balance::Balance;
use crate::error::Result;
use std::io::Write;

/// Writes final balances as CSV (`user,amount`), sorted by user id for
/// deterministic output.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(target),
        }
    }

    pub fn write_balances(&mut self, mut balances: Vec<Balance>) -> Result<()> {
        balances.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        self.writer.write_record(["user", "amount"])?;
        for balance in balances {
            self.writer
                .write_record([balance.user_id.as_str(), &balance.amount.to_string()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::UserId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writer_sorted_output() {
        let mut bob = Balance::zero(UserId::new("bob").unwrap());
        bob.amount = dec!(55.00);
        let mut alice = Balance::zero(UserId::new("alice").unwrap());
        alice.amount = dec!(25.00);

        let mut out = Vec::new();
        BalanceWriter::new(&mut out)
            .write_balances(vec![bob, alice])
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "user,amount\nalice,25.00\nbob,55.00\n");
    }
}
