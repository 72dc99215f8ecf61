/*
 * Created on Mon Jan 02 2023
 *
 * This file is a part of Sable
 * Sable is a free and open-source Redis-wire-compatible in-memory data
 * store written by Sayan Nandan ("the Author") with the vision to provide
 * a simple, correct and fast caching primitive without compromising on
 * compatibility with the existing client ecosystem
 *
 * Copyright (c) 2023, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

pub mod terminal {
    //! Colored terminal status lines
    use std::fmt;
    use std::io::Write;
    use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

    /// How loud a status line is; maps onto a foreground color
    #[derive(Debug, Clone, Copy)]
    pub enum Severity {
        Info,
        Warning,
        Error,
        Success,
    }

    impl Severity {
        const fn color(self) -> Color {
            match self {
                Severity::Info => Color::Cyan,
                Severity::Warning => Color::Yellow,
                Severity::Error => Color::Red,
                Severity::Success => Color::Green,
            }
        }
    }

    /// Write `item` to stdout in the severity's color, restoring the
    /// terminal afterwards
    pub fn write_styled<T: fmt::Display>(item: T, severity: Severity) -> fmt::Result {
        let mut stdout = StandardStream::stdout(ColorChoice::Always);
        if stdout
            .set_color(ColorSpec::new().set_fg(Some(severity.color())))
            .is_err()
        {
            return Err(fmt::Error);
        }
        if write!(&mut stdout, "{}", item).is_err() {
            return Err(fmt::Error);
        }
        if stdout.reset().is_err() {
            return Err(fmt::Error);
        }
        Ok(())
    }

    pub fn write_info<T: fmt::Display>(item: T) -> fmt::Result {
        write_styled(item, Severity::Info)
    }
    pub fn write_warning<T: fmt::Display>(item: T) -> fmt::Result {
        write_styled(item, Severity::Warning)
    }
    pub fn write_error<T: fmt::Display>(item: T) -> fmt::Result {
        write_styled(item, Severity::Error)
    }
}
